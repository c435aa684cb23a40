use crate::param::DatasetEntry;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;

/// Expression matrix of one dataset: rows are samples, columns genes, NaN for missing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExpressionMatrix {
    pub samples: Vec<String>,
    pub genes: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Shape and per-sample medians of a dataset, what the explore figures are drawn from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DatasetSummary {
    pub name: String,
    pub n_samples: usize,
    pub n_genes: usize,
    /// genes measured in every sample
    pub n_complete_genes: usize,
    /// None for a sample without any measured gene
    pub sample_medians: Vec<Option<f64>>,
}

impl ExpressionMatrix {
    /// Reads a tab-separated matrix whose first column is the sample identifier.
    pub fn load(path: &str) -> Result<ExpressionMatrix, Box<dyn Error>> {
        let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
        let genes: Vec<String> = reader.headers()?.iter().skip(1).map(String::from).collect();

        let mut samples = Vec::new();
        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut fields = record.iter();
            samples.push(fields.next().unwrap_or("").to_string());
            let row: Vec<f64> = fields.map(|v| v.trim().parse::<f64>().ok().filter(|x| x.is_finite()).unwrap_or(f64::NAN)).collect();
            if row.len() != genes.len() {
                return Err(format!("{}: sample {} has {} values for {} genes", path, samples.len(), row.len(), genes.len()).into());
            }
            values.push(row);
        }

        Ok(ExpressionMatrix { samples, genes, values })
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    /// Median of the measured genes of each sample.
    pub fn sample_medians(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .map(|row| {
                let measured: Vec<f64> = row.iter().copied().filter(|v| v.is_finite()).collect();
                if measured.is_empty() {
                    None
                } else {
                    Some(Data::new(measured).median())
                }
            })
            .collect()
    }

    pub fn complete_genes(&self) -> usize {
        (0..self.n_genes()).filter(|&j| self.values.iter().all(|row| row[j].is_finite())).count()
    }
}

/// Datasets keyed by identifier, filtered once at load time.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpressionDatasets {
    pub datasets: BTreeMap<String, ExpressionMatrix>,
}

impl ExpressionDatasets {
    /// Loads every entry and keeps those with at least `min_sample_count` samples.
    pub fn load(entries: &[DatasetEntry], min_sample_count: usize) -> Result<ExpressionDatasets, Box<dyn Error>> {
        let mut datasets = BTreeMap::new();
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(format!("Dataset '{}' is listed twice", entry.name).into());
            }
            let matrix = ExpressionMatrix::load(&entry.path)?;
            if matrix.n_samples() < min_sample_count {
                info!("Skipping dataset {}: {} samples < {}", entry.name, matrix.n_samples(), min_sample_count);
                continue;
            }
            debug!("Dataset {}: {} samples x {} genes", entry.name, matrix.n_samples(), matrix.n_genes());
            datasets.insert(entry.name.clone(), matrix);
        }
        Ok(ExpressionDatasets { datasets })
    }

    pub fn names(&self) -> Vec<&str> {
        self.datasets.keys().map(|k| k.as_str()).collect()
    }

    pub fn summaries(&self) -> Vec<DatasetSummary> {
        self.datasets
            .iter()
            .map(|(name, matrix)| DatasetSummary {
                name: name.clone(),
                n_samples: matrix.n_samples(),
                n_genes: matrix.n_genes(),
                n_complete_genes: matrix.complete_genes(),
                sample_medians: matrix.sample_medians(),
            })
            .collect()
    }
}
