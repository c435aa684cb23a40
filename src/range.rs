use crate::error::LlrError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of bins per axis used when nothing else is configured.
pub const DEFAULT_N_BINS: usize = 20;

/// Family of a gene-pair feature, which fixes the interval its values live in.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::upper_case_acronyms)]
pub enum FeatureType {
    /// correlation coefficient, in [-1, 1]
    CC,
    /// mutual rank, in [0, 1]
    MR,
}

impl FeatureType {
    pub fn tag(&self) -> &'static str {
        match self {
            FeatureType::CC => "CC",
            FeatureType::MR => "MR",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for FeatureType {
    type Err = LlrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CC" => Ok(FeatureType::CC),
            "MR" => Ok(FeatureType::MR),
            _ => Err(LlrError::InvalidRange { tag: s.to_string() }),
        }
    }
}

/// Closed interval `[lo, hi]` split into `n_bins` equal-width bins.
///
/// Every histogram of one feature type is built on the same `FeatureRange`, so
/// per-class grids can be compared and combined cell by cell.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct FeatureRange {
    pub lo: f64,
    pub hi: f64,
    pub n_bins: usize,
}

impl FeatureRange {
    pub fn new(lo: f64, hi: f64, n_bins: usize) -> Result<FeatureRange, LlrError> {
        if n_bins == 0 {
            return Err(LlrError::InvalidBins("at least one bin is required".to_string()));
        }
        if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
            return Err(LlrError::InvalidBins(format!("empty or non-finite interval [{}, {}]", lo, hi)));
        }
        Ok(FeatureRange { lo, hi, n_bins })
    }

    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.n_bins as f64
    }

    fn edge(&self, i: usize) -> f64 {
        if i == self.n_bins {
            self.hi
        } else {
            self.lo + i as f64 * self.bin_width()
        }
    }

    /// `n_bins + 1` evenly spaced edges, the last one exactly `hi`.
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.n_bins).map(|i| self.edge(i)).collect()
    }

    /// Bin holding `value`, or None when it falls outside `[lo, hi]` or is not finite.
    /// Bins are half-open except the last one, which also holds `hi`.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.lo || value > self.hi {
            return None;
        }
        if value == self.hi {
            return Some(self.n_bins - 1);
        }
        let mut idx = (((value - self.lo) / self.bin_width()).floor() as usize).min(self.n_bins - 1);
        // the division can land one bin off on an edge; settle against the edges themselves
        if idx > 0 && value < self.edge(idx) {
            idx -= 1;
        } else if idx + 1 < self.n_bins && value >= self.edge(idx + 1) {
            idx += 1;
        }
        Some(idx)
    }
}

/// The one table mapping a feature-type tag to its interval.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RangePolicy {
    ranges: BTreeMap<String, (f64, f64)>,
    n_bins: usize,
}

impl Default for RangePolicy {
    fn default() -> Self {
        RangePolicy::new(DEFAULT_N_BINS)
    }
}

impl RangePolicy {
    pub fn new(n_bins: usize) -> RangePolicy {
        let mut ranges = BTreeMap::new();
        ranges.insert(FeatureType::CC.tag().to_string(), (-1.0, 1.0));
        ranges.insert(FeatureType::MR.tag().to_string(), (0.0, 1.0));
        RangePolicy { ranges, n_bins }
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Adds (or replaces) the interval of a tag.
    pub fn register(&mut self, tag: &str, lo: f64, hi: f64) -> Result<(), LlrError> {
        FeatureRange::new(lo, hi, self.n_bins)?;
        self.ranges.insert(tag.to_string(), (lo, hi));
        Ok(())
    }

    pub fn resolve(&self, tag: &str) -> Result<FeatureRange, LlrError> {
        match self.ranges.get(tag) {
            Some(&(lo, hi)) => FeatureRange::new(lo, hi, self.n_bins),
            None => Err(LlrError::InvalidRange { tag: tag.to_string() }),
        }
    }

    pub fn resolve_type(&self, feature_type: FeatureType) -> Result<FeatureRange, LlrError> {
        self.resolve(feature_type.tag())
    }

    pub fn tags(&self) -> Vec<String> {
        self.ranges.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_ranges() {
        let policy = RangePolicy::default();
        assert_eq!(policy.resolve("CC").unwrap(), FeatureRange { lo: -1.0, hi: 1.0, n_bins: 20 }, "CC features live in [-1, 1]");
        assert_eq!(policy.resolve("MR").unwrap(), FeatureRange { lo: 0.0, hi: 1.0, n_bins: 20 }, "MR features live in [0, 1]");
        assert_eq!(policy.resolve_type(FeatureType::MR).unwrap(), policy.resolve("MR").unwrap());
    }

    #[test]
    fn test_unknown_tag_is_invalid_range() {
        let policy = RangePolicy::default();
        assert_eq!(policy.resolve("PCC"), Err(LlrError::InvalidRange { tag: "PCC".to_string() }));
        assert!("XX".parse::<FeatureType>().is_err());
        assert_eq!(" mr".parse::<FeatureType>().unwrap(), FeatureType::MR, "tags are case-insensitive");
    }

    #[test]
    fn test_register_extra_range() {
        let mut policy = RangePolicy::new(10);
        policy.register("Z", -3.0, 3.0).unwrap();
        assert_eq!(policy.resolve("Z").unwrap(), FeatureRange { lo: -3.0, hi: 3.0, n_bins: 10 });
        assert!(policy.register("bad", 1.0, 1.0).is_err(), "an empty interval must be rejected");
        assert_eq!(policy.tags(), vec!["CC", "MR", "Z"]);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(matches!(RangePolicy::new(0).resolve("CC"), Err(LlrError::InvalidBins(_))));
    }

    #[test]
    fn test_inner_edges_open_their_bin() {
        for (lo, hi, n_bins) in [(-1.0, 1.0, 20), (0.0, 1.0, 20), (0.0, 1.0, 10)] {
            let range = FeatureRange::new(lo, hi, n_bins).unwrap();
            let edges = range.edges();
            for (i, &edge) in edges.iter().enumerate().take(n_bins).skip(1) {
                assert_eq!(range.bin_index(edge), Some(i), "edge {} of [{}, {}]/{} should open bin {}", edge, lo, hi, n_bins, i);
                assert_eq!(range.bin_index(edge - 1e-9), Some(i - 1), "just below edge {} belongs to bin {}", edge, i - 1);
            }
        }

        let cc = FeatureRange::new(-1.0, 1.0, 20).unwrap();
        assert_eq!(cc.bin_index(-0.9), Some(1), "a rounded correlation on an edge goes to the upper bin");
        assert_eq!(cc.bin_index(-0.8), Some(2));
    }

    #[test]
    fn test_edges_and_bin_index() {
        let range = FeatureRange::new(-1.0, 1.0, 4).unwrap();
        assert_eq!(range.edges(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(range.bin_index(-1.0), Some(0));
        assert_eq!(range.bin_index(-0.5), Some(1), "inner edges belong to the upper bin");
        assert_eq!(range.bin_index(0.99), Some(3));
        assert_eq!(range.bin_index(1.0), Some(3), "the upper bound belongs to the last bin");
        assert_eq!(range.bin_index(1.01), None);
        assert_eq!(range.bin_index(-1.5), None);
        assert_eq!(range.bin_index(f64::NAN), None);
    }
}
