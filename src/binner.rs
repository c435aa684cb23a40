use crate::error::LlrError;
use crate::range::FeatureRange;
use serde::{Deserialize, Serialize};

/// Fixed-range 1-D histogram: either raw occupancy counts or a density.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Histogram1D {
    pub edges: Vec<f64>,
    pub values: Vec<f64>,
    pub normalized: bool,
    /// number of observations that fell inside the range
    pub in_range: usize,
}

/// Fixed-range 2-D histogram. `values[i][j]` is the cell of x-bin `i` and y-bin `j`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Histogram2D {
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    pub values: Vec<Vec<f64>>,
    pub normalized: bool,
    pub in_range: usize,
}

fn grid_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

impl Histogram1D {
    pub fn bin_width(&self) -> f64 {
        (self.edges[self.edges.len() - 1] - self.edges[0]) / self.values.len() as f64
    }

    pub fn max_value(&self) -> f64 {
        grid_max(&self.values)
    }

    /// Sum of value × bin width; 1 for a non-empty density.
    pub fn mass(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.bin_width()
    }

    /// Re-derives occupancy counts from a density built on `total` in-range observations.
    pub fn to_counts(&self, total: usize) -> Vec<f64> {
        if !self.normalized {
            return self.values.clone();
        }
        let scale = self.bin_width() * total as f64;
        self.values.iter().map(|d| d * scale).collect()
    }
}

impl Histogram2D {
    pub fn bin_area(&self) -> f64 {
        let nx = self.values.len() as f64;
        let ny = self.values.first().map_or(0, |row| row.len()) as f64;
        let dx = (self.x_edges[self.x_edges.len() - 1] - self.x_edges[0]) / nx;
        let dy = (self.y_edges[self.y_edges.len() - 1] - self.y_edges[0]) / ny;
        dx * dy
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().map(|row| grid_max(row)).fold(0.0, f64::max)
    }

    pub fn mass(&self) -> f64 {
        self.values.iter().flatten().sum::<f64>() * self.bin_area()
    }

    pub fn to_counts(&self, total: usize) -> Vec<Vec<f64>> {
        if !self.normalized {
            return self.values.clone();
        }
        let scale = self.bin_area() * total as f64;
        self.values.iter().map(|row| row.iter().map(|d| d * scale).collect()).collect()
    }
}

/// Bins a sample over `range`.
///
/// With `normalize` the result is a probability density over the range: values
/// outside `[lo, hi]` (and non-finite ones) are left out of the mass. An empty
/// sample yields an all-zero grid in both modes.
pub fn bin(values: &[f64], range: &FeatureRange, normalize: bool) -> Histogram1D {
    let mut counts = vec![0.0; range.n_bins];
    let mut in_range = 0;
    for idx in values.iter().filter_map(|&v| range.bin_index(v)) {
        counts[idx] += 1.0;
        in_range += 1;
    }

    if normalize && in_range > 0 {
        let scale = 1.0 / (in_range as f64 * range.bin_width());
        counts.iter_mut().for_each(|c| *c *= scale);
    }

    Histogram1D { edges: range.edges(), values: counts, normalized: normalize, in_range }
}

/// Joint histogram of two parallel samples over the same `range` on both axes.
///
/// A pair is counted only when both coordinates fall inside the range.
pub fn bin_2d(xs: &[f64], ys: &[f64], range: &FeatureRange, normalize: bool) -> Result<Histogram2D, LlrError> {
    if xs.len() != ys.len() {
        return Err(LlrError::ShapeMismatch { left: xs.len(), right: ys.len() });
    }

    let n = range.n_bins;
    let mut counts = vec![vec![0.0; n]; n];
    let mut in_range = 0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        if let (Some(i), Some(j)) = (range.bin_index(x), range.bin_index(y)) {
            counts[i][j] += 1.0;
            in_range += 1;
        }
    }

    if normalize && in_range > 0 {
        let width = range.bin_width();
        let scale = 1.0 / (in_range as f64 * width * width);
        counts.iter_mut().flatten().for_each(|c| *c *= scale);
    }

    let edges = range.edges();
    Ok(Histogram2D { x_edges: edges.clone(), y_edges: edges, values: counts, normalized: normalize, in_range })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(n_bins: usize) -> FeatureRange {
        FeatureRange::new(-1.0, 1.0, n_bins).unwrap()
    }

    #[test]
    fn test_bin_counts() {
        let hist = bin(&[-0.9, -0.1, 0.0, 0.2, 0.7, 1.0], &cc(4), false);
        assert_eq!(hist.values, vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(hist.in_range, 6);
        assert_eq!(hist.edges, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_bin_density_integrates_to_one() {
        let values = [-0.95, -0.3, -0.3, 0.1, 0.45, 0.5, 0.99, 1.0];
        let hist = bin(&values, &cc(10), true);
        assert!(hist.values.iter().all(|&d| d >= 0.0), "densities must be non-negative");
        assert!((hist.mass() - 1.0).abs() < 1e-12, "density mass should be 1, got {}", hist.mass());
    }

    #[test]
    fn test_out_of_range_values_excluded_from_mass() {
        let hist = bin(&[0.1, 0.2, 5.0, f64::NAN, -3.0], &FeatureRange::new(0.0, 1.0, 5).unwrap(), true);
        assert_eq!(hist.in_range, 2);
        assert!((hist.mass() - 1.0).abs() < 1e-12, "only in-range values carry mass");
    }

    #[test]
    fn test_empty_sample_gives_zero_grid() {
        let hist = bin(&[], &cc(5), true);
        assert_eq!(hist.values, vec![0.0; 5]);
        let grid = bin_2d(&[], &[], &cc(3), true).unwrap();
        assert!(grid.values.iter().flatten().all(|&v| v == 0.0));
        assert_eq!(grid.max_value(), 0.0);
    }

    #[test]
    fn test_bin_2d_counts_and_density() {
        let range = FeatureRange::new(0.0, 1.0, 2).unwrap();
        let xs = [0.1, 0.2, 0.9, 0.6, 1.0];
        let ys = [0.1, 0.8, 0.9, 0.2, 1.0];
        let counts = bin_2d(&xs, &ys, &range, false).unwrap();
        assert_eq!(counts.values, vec![vec![1.0, 1.0], vec![1.0, 2.0]]);

        let density = bin_2d(&xs, &ys, &range, true).unwrap();
        assert!((density.mass() - 1.0).abs() < 1e-12);
        assert!((density.max_value() - 2.0 / (5.0 * 0.25)).abs() < 1e-12);
    }

    #[test]
    fn test_bin_2d_shape_mismatch() {
        let err = bin_2d(&[0.1, 0.2], &[0.3], &cc(2), false).unwrap_err();
        assert_eq!(err, LlrError::ShapeMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_density_to_counts_roundtrip() {
        let values = [-0.8, -0.8, -0.2, 0.3, 0.31, 0.32, 0.9];
        let counts = bin(&values, &cc(8), false);
        let density = bin(&values, &cc(8), true);
        for (a, b) in density.to_counts(density.in_range).iter().zip(counts.values.iter()) {
            assert!((a - b).abs() < 1e-9, "re-derived count {} differs from {}", a, b);
        }

        let xs = [0.1, 0.15, 0.7, 0.95];
        let ys = [0.2, 0.25, 0.4, 0.99];
        let range = FeatureRange::new(0.0, 1.0, 3).unwrap();
        let counts = bin_2d(&xs, &ys, &range, false).unwrap();
        let density = bin_2d(&xs, &ys, &range, true).unwrap();
        let rederived = density.to_counts(density.in_range);
        for (row_a, row_b) in rederived.iter().zip(counts.values.iter()) {
            for (a, b) in row_a.iter().zip(row_b.iter()) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
