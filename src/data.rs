use crate::error::LlrError;
use crate::utils::truncate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// Cell contents read as a missing value.
const MISSING_TOKENS: [&str; 7] = ["", "NA", "NaN", "nan", "null", "None", "N/A"];

/// Label given to rows whose class cannot be read.
pub const UNKNOWN_CLASS: u8 = 2;

/// Gene-pair feature table: one row per gene pair, a binary class label and
/// numeric feature columns where missing values are stored as NaN.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureTable {
    pub ids: Vec<String>,
    pub y: Vec<u8>,
    pub features: Vec<String>,
    pub columns: BTreeMap<String, Vec<f64>>,
    pub row_len: usize,
}

fn parse_value(field: &str) -> Option<f64> {
    let field = field.trim();
    if MISSING_TOKENS.contains(&field) {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_class(field: &str) -> Option<u8> {
    match field.trim() {
        "1" | "1.0" | "True" | "true" => Some(1),
        "0" | "0.0" | "False" | "false" => Some(0),
        _ => None,
    }
}

impl FeatureTable {
    pub fn new() -> FeatureTable {
        FeatureTable { ids: Vec::new(), y: Vec::new(), features: Vec::new(), columns: BTreeMap::new(), row_len: 0 }
    }

    /// Builds a table from in-memory columns; every column must have one value per label.
    pub fn from_columns(y: Vec<u8>, columns: Vec<(&str, Vec<f64>)>) -> Result<FeatureTable, LlrError> {
        let mut table = FeatureTable::new();
        table.row_len = y.len();
        table.ids = (0..y.len()).map(|i| i.to_string()).collect();
        table.y = y;
        for (name, values) in columns {
            if values.len() != table.row_len {
                return Err(LlrError::ShapeMismatch { left: values.len(), right: table.row_len });
            }
            table.features.push(name.to_string());
            table.columns.insert(name.to_string(), values);
        }
        Ok(table)
    }

    /// Loads a tab-separated table with a header line.
    ///
    /// `class_column` holds the label (0/1; anything else becomes class 2 with a
    /// warning). `id_column`, when not empty, names the row identifier column.
    /// Every other column is read as a numeric feature.
    pub fn load(path: &str, class_column: &str, id_column: &str) -> Result<FeatureTable, Box<dyn Error>> {
        info!("Loading feature table {}...", path);
        let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').has_headers(true).from_path(path)?;
        let headers = reader.headers()?.clone();

        let class_idx = headers
            .iter()
            .position(|h| h == class_column)
            .ok_or_else(|| LlrError::MissingColumn { name: class_column.to_string() })?;
        let id_idx = if id_column.is_empty() {
            None
        } else {
            Some(headers.iter().position(|h| h == id_column).ok_or_else(|| LlrError::MissingColumn { name: id_column.to_string() })?)
        };
        let feature_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != class_idx && Some(i) != id_idx).collect();

        let mut table = FeatureTable::new();
        table.features = feature_idx.iter().map(|&i| headers[i].to_string()).collect();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); feature_idx.len()];
        let mut unknown_labels = 0;
        let mut unreadable = 0;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let id = match id_idx {
                Some(i) => record.get(i).unwrap_or("").to_string(),
                None => row.to_string(),
            };
            let label = parse_class(record.get(class_idx).unwrap_or("")).unwrap_or_else(|| {
                unknown_labels += 1;
                UNKNOWN_CLASS
            });

            for (column, &i) in columns.iter_mut().zip(feature_idx.iter()) {
                let field = record.get(i).unwrap_or("");
                let value = parse_value(field).unwrap_or_else(|| {
                    if !MISSING_TOKENS.contains(&field.trim()) {
                        unreadable += 1;
                    }
                    f64::NAN
                });
                column.push(value);
            }
            table.ids.push(id);
            table.y.push(label);
        }

        if unknown_labels > 0 {
            warn!("{} rows have no readable class in '{}'. Setting their class to {}.", unknown_labels, class_column, UNKNOWN_CLASS);
        }
        if unreadable > 0 {
            warn!("{} non-numeric feature values were read as missing.", unreadable);
        }

        table.row_len = table.y.len();
        table.columns = table.features.iter().cloned().zip(columns).collect();
        info!("{} rows, {} feature columns", table.row_len, table.features.len());

        Ok(table)
    }

    pub fn column(&self, name: &str) -> Result<&[f64], LlrError> {
        self.columns.get(name).map(|c| c.as_slice()).ok_or_else(|| LlrError::MissingColumn { name: name.to_string() })
    }

    /// (class 0, class 1, unknown) row counts.
    pub fn class_counts(&self) -> (usize, usize, usize) {
        self.y.iter().fold((0, 0, 0), |(n0, n1, n2), &c| match c {
            0 => (n0 + 1, n1, n2),
            1 => (n0, n1 + 1, n2),
            _ => (n0, n1, n2 + 1),
        })
    }

    /// Non-missing values of one feature with their labels.
    pub fn labeled_sample(&self, name: &str) -> Result<(Vec<f64>, Vec<u8>), LlrError> {
        let column = self.column(name)?;
        Ok(column.iter().zip(self.y.iter()).filter(|(v, _)| v.is_finite()).map(|(&v, &c)| (v, c)).unzip())
    }

    /// Rows where both features are present, as parallel (x, y, label) vectors.
    pub fn complete_pairs(&self, x_name: &str, y_name: &str) -> Result<(Vec<f64>, Vec<f64>, Vec<u8>), LlrError> {
        let xs = self.column(x_name)?;
        let ys = self.column(y_name)?;
        let mut out = (Vec::new(), Vec::new(), Vec::new());
        for ((&x, &y), &c) in xs.iter().zip(ys.iter()).zip(self.y.iter()) {
            if x.is_finite() && y.is_finite() {
                out.0.push(x);
                out.1.push(y);
                out.2.push(c);
            }
        }
        Ok(out)
    }
}

impl Default for FeatureTable {
    fn default() -> Self {
        FeatureTable::new()
    }
}

impl fmt::Display for FeatureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n0, n1, n2) = self.class_counts();
        writeln!(f, "Rows: {}   Features: {}   Class 0: {}   Class 1: {}   Unknown: {}", self.row_len, self.features.len(), n0, n1, n2)?;

        writeln!(f, "{:<20} {}", "id", truncate(self.features.join("\t"), 100))?;
        // Limit to the first 20 rows
        for i in (0..self.row_len).take(20) {
            let row_display: String = self
                .features
                .iter()
                .map(|name| {
                    let v = self.columns[name][i];
                    if v.is_finite() { format!("{:.2}", v) } else { "".to_string() }
                })
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(f, "{:<20} {}\t| {}", truncate(self.ids[i].clone(), 20), truncate(row_display, 80), self.y[i])?;
        }

        Ok(())
    }
}

impl fmt::Debug for FeatureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the Display formatter
        write!(f, "{}", self)
    }
}
