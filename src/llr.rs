//! Binned likelihood-ratio estimation for gene-pair features.
//!
//! The 1-D form returns the two class-conditional densities of a single
//! feature. The 2-D form bins an RNA feature against its protein counterpart
//! for each class and combines the count grids into a smoothed,
//! prior-corrected log ratio:
//!
//! ```text
//! ratio[i][j] = (c1[i][j] + 1) / (c0[i][j] + n0/n1) / (n1/n0)
//! ```
//!
//! The additive terms keep every cell strictly positive, so the log is always
//! finite as long as both classes have at least one observation.

use crate::binner::{bin, bin_2d, Histogram1D};
use crate::error::LlrError;
use crate::range::FeatureRange;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Log-ratio bound renderers clip to. The estimator itself never clamps.
pub const DISPLAY_LOG_RATIO_BOUND: f64 = 4.0;

pub const NEGATIVE_CLASS: u8 = 0;
pub const POSITIVE_CLASS: u8 = 1;

/// Class-conditional densities of one feature.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarginalDensity {
    pub positive: Histogram1D,
    pub negative: Histogram1D,
    pub n_positive: usize,
    pub n_negative: usize,
    /// shared height ceiling for both histograms
    pub max_density: f64,
}

/// Log-likelihood-ratio surface of an RNA/protein feature pair.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JointLlr {
    /// `log_ratio[i][j]`: RNA bin `i`, protein bin `j`
    pub log_ratio: Vec<Vec<f64>>,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// largest density cell over both classes, the common colour ceiling
    pub max_density: f64,
    pub n_positive: usize,
    pub n_negative: usize,
    pub positive_counts: Vec<Vec<f64>>,
    pub negative_counts: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SurfaceSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// cells outside the display bound
    pub n_clipped: usize,
}

impl JointLlr {
    pub fn n_bins(&self) -> usize {
        self.log_ratio.len()
    }

    pub fn summary(&self) -> SurfaceSummary {
        let cells: Vec<f64> = self.log_ratio.iter().flatten().copied().collect();
        let n_clipped = cells.iter().filter(|v| v.abs() > DISPLAY_LOG_RATIO_BOUND).count();
        SurfaceSummary {
            mean: cells.iter().mean(),
            std_dev: if cells.len() > 1 { cells.iter().std_dev() } else { 0.0 },
            min: Statistics::min(cells.iter()),
            max: Statistics::max(cells.iter()),
            n_clipped,
        }
    }

    /// Copy of the surface clipped to `[-bound, bound]` for display.
    pub fn clipped(&self, bound: f64) -> Vec<Vec<f64>> {
        self.log_ratio.iter().map(|row| row.iter().map(|v| v.clamp(-bound, bound)).collect()).collect()
    }
}

fn check_same_length(left: usize, right: usize) -> Result<(), LlrError> {
    if left != right {
        return Err(LlrError::ShapeMismatch { left, right });
    }
    Ok(())
}

/// Splits `values` by label, keeping only finite values of classes 0 and 1.
fn partition(values: &[f64], labels: &[u8]) -> (Vec<f64>, Vec<f64>) {
    let mut negative = Vec::new();
    let mut positive = Vec::new();
    for (&v, &label) in values.iter().zip(labels.iter()) {
        if !v.is_finite() {
            continue;
        }
        match label {
            NEGATIVE_CLASS => negative.push(v),
            POSITIVE_CLASS => positive.push(v),
            _ => {}
        }
    }
    (negative, positive)
}

/// Class-conditional densities of one feature over `range`.
///
/// Missing (non-finite) values and rows whose label is neither 0 nor 1 are
/// ignored. An empty class gives an all-zero density rather than an error:
/// no ratio is formed here.
pub fn marginal(values: &[f64], labels: &[u8], range: &FeatureRange) -> Result<MarginalDensity, LlrError> {
    check_same_length(values.len(), labels.len())?;
    let (negative, positive) = partition(values, labels);

    let positive_density = bin(&positive, range, true);
    let negative_density = bin(&negative, range, true);
    let max_density = positive_density.max_value().max(negative_density.max_value());

    Ok(MarginalDensity {
        positive: positive_density,
        negative: negative_density,
        n_positive: positive.len(),
        n_negative: negative.len(),
        max_density,
    })
}

/// Smoothed, prior-corrected log ratio of two count grids of equal shape.
///
/// `n1` / `n0` are the class sizes (which may exceed the grid totals when
/// some observations fell outside the range).
pub fn log_ratio_from_counts(c1: &[Vec<f64>], c0: &[Vec<f64>], n1: usize, n0: usize) -> Result<Vec<Vec<f64>>, LlrError> {
    if n0 == 0 {
        return Err(LlrError::EmptyClass { class: NEGATIVE_CLASS });
    }
    if n1 == 0 {
        return Err(LlrError::EmptyClass { class: POSITIVE_CLASS });
    }
    check_same_length(c1.len(), c0.len())?;

    let n1 = n1 as f64;
    let n0 = n0 as f64;
    let prior = n1 / n0;
    let pseudo = n0 / n1;

    c1.iter()
        .zip(c0.iter())
        .map(|(row1, row0)| {
            check_same_length(row1.len(), row0.len())?;
            Ok(row1.iter().zip(row0.iter()).map(|(&a, &b)| ((a + 1.0) / (b + pseudo) / prior).ln()).collect())
        })
        .collect()
}

/// Joint log-likelihood ratio of an RNA feature against its protein counterpart.
///
/// Rows missing either value are dropped before the class split, so both
/// classes are built from the same complete rows.
pub fn joint_llr(rna: &[f64], pro: &[f64], labels: &[u8], range: &FeatureRange) -> Result<JointLlr, LlrError> {
    check_same_length(rna.len(), pro.len())?;
    check_same_length(rna.len(), labels.len())?;

    let mut rna_by_class: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
    let mut pro_by_class: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
    for ((&x, &y), &label) in rna.iter().zip(pro.iter()).zip(labels.iter()) {
        if !(x.is_finite() && y.is_finite()) || label > POSITIVE_CLASS {
            continue;
        }
        rna_by_class[label as usize].push(x);
        pro_by_class[label as usize].push(y);
    }

    let n0 = rna_by_class[NEGATIVE_CLASS as usize].len();
    let n1 = rna_by_class[POSITIVE_CLASS as usize].len();
    if n0 == 0 {
        return Err(LlrError::EmptyClass { class: NEGATIVE_CLASS });
    }
    if n1 == 0 {
        return Err(LlrError::EmptyClass { class: POSITIVE_CLASS });
    }

    let (neg_rna, neg_pro) = (&rna_by_class[NEGATIVE_CLASS as usize], &pro_by_class[NEGATIVE_CLASS as usize]);
    let (pos_rna, pos_pro) = (&rna_by_class[POSITIVE_CLASS as usize], &pro_by_class[POSITIVE_CLASS as usize]);

    let max_density = bin_2d(neg_rna, neg_pro, range, true)?
        .max_value()
        .max(bin_2d(pos_rna, pos_pro, range, true)?.max_value());
    let negative = bin_2d(neg_rna, neg_pro, range, false)?;
    let positive = bin_2d(pos_rna, pos_pro, range, false)?;

    let log_ratio = log_ratio_from_counts(&positive.values, &negative.values, n1, n0)?;

    Ok(JointLlr {
        log_ratio,
        x_edges: positive.x_edges,
        y_edges: positive.y_edges,
        max_density,
        n_positive: n1,
        n_negative: n0,
        positive_counts: positive.values,
        negative_counts: negative.values,
    })
}
