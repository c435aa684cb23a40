use crate::datasets::DatasetSummary;
use crate::llr::{JointLlr, MarginalDensity, SurfaceSummary};
use crate::param::Param;
use crate::utils::edge_number;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::Write;
use std::path::Path;

/// Everything estimated for one RNA/protein pair and one feature type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PairReport {
    pub pair: String,
    pub feature_type: String,
    pub rna_feature: String,
    pub protein_feature: String,
    pub rna_marginal: MarginalDensity,
    pub protein_marginal: MarginalDensity,
    pub joint: JointLlr,
    pub summary: SurfaceSummary,
}

impl PairReport {
    /// Stem shared by every file rendered for this pair.
    pub fn file_stem(&self) -> String {
        format!("{}_rna_pro_{}", self.pair, self.feature_type)
    }
}

/// A (pair, feature type) job that could not be estimated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JobFailure {
    pub pair: String,
    pub feature_type: String,
    pub reason: String,
}

/// Result of one run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Report {
    pub id: String,
    pub version: String,
    pub timestamp: String,
    pub parameters: Param,
    pub n_rows: usize,
    pub pairs: Vec<PairReport>,
    pub failures: Vec<JobFailure>,
    pub datasets: Vec<DatasetSummary>,
    pub execution_time: f64,
}

impl Report {
    pub fn find(&self, pair: &str, feature_type: &str) -> Option<&PairReport> {
        self.pairs.iter().find(|p| p.pair == pair && p.feature_type == feature_type)
    }

    /// Terminal summary of the run.
    pub fn display_results(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Report {} ({}) - {} gene pairs", self.id, self.version, edge_number(self.n_rows as f64));

        if !self.datasets.is_empty() {
            let _ = writeln!(out, "\nDatasets:");
            for ds in &self.datasets {
                let _ = writeln!(out, "  {:<16} {:>6} samples {:>7} genes ({} complete)", ds.name, ds.n_samples, ds.n_genes, ds.n_complete_genes);
            }
        }

        let _ = writeln!(out, "\n{:<16} {:<4} {:>7} {:>7} {:>8} {:>8} {:>8} {:>8} {:>7}", "pair", "type", "n_pos", "n_neg", "mean", "sd", "min", "max", "clipped");
        for p in &self.pairs {
            let s = &p.summary;
            let _ = writeln!(
                out,
                "{:<16} {:<4} {:>7} {:>7} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>7}",
                p.pair, p.feature_type, p.joint.n_positive, p.joint.n_negative, s.mean, s.std_dev, s.min, s.max, s.n_clipped
            );
        }

        for f in &self.failures {
            let _ = writeln!(out, "\x1b[0;31m{:<16} {:<4} skipped: {}\x1b[0m", f.pair, f.feature_type, f.reason);
        }

        let _ = writeln!(out, "\nComputed in {:.2}s", self.execution_time);
        out
    }

    /// Saves the report in a format chosen from the file extension.
    pub fn save_auto<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

        match ext.as_str() {
            "json" => self.save_json(path),
            "bin" | "bincode" => self.save_bincode(path),
            _ => {
                warn!("Unknown format. Saving report in json.");
                self.save_json(path.with_extension("json"))
            }
        }
    }

    fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Saves as Bincode (compact binary, Rust-only)
    fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    pub fn load_auto<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

        match ext.as_str() {
            "json" => Self::load_json(path),
            "bin" | "bincode" => Self::load_bincode(path),
            // save_auto writes unknown extensions as a .json sibling
            _ => Self::load_bincode(path)
                .or_else(|_| Self::load_json(path))
                .or_else(|_| Self::load_json(path.with_extension("json"))),
        }
    }

    fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}
