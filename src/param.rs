use crate::llr::DISPLAY_LOG_RATIO_BOUND;
use crate::range::{FeatureType, RangePolicy, DEFAULT_N_BINS};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub llr: Llr,
    #[serde(skip)]
    pub tag: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "one_default")]
    pub thread_number: usize,
    #[serde(default = "empty_string")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "true_default")]
    pub display_colorful: bool,
    #[serde(default = "empty_string")]
    pub save_report: String,
    #[serde(default = "empty_string")]
    pub output_dir: String,
}

/// One expression matrix of the explore step.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatasetEntry {
    pub name: String,
    pub path: String,
}

/// An RNA/protein feature pair: the column of feature type `FT` is `<rna>_<FT>` / `<protein>_<FT>`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PairDefinition {
    pub name: String,
    pub rna: String,
    pub protein: String,
}

impl PairDefinition {
    pub fn rna_feature(&self, feature_type: &str) -> String {
        format!("{}_{}", self.rna, feature_type)
    }

    pub fn protein_feature(&self, feature_type: &str) -> String {
        format!("{}_{}", self.protein, feature_type)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Data {
    #[serde(default = "empty_string")]
    pub features: String,
    #[serde(default = "class_column_default")]
    pub class_column: String,
    #[serde(default = "empty_string")]
    pub id_column: String,
    #[serde(default = "uzero_default")]
    pub min_sample_count: usize,
    #[serde(default = "Vec::new")]
    pub datasets: Vec<DatasetEntry>,
    #[serde(default = "Vec::new")]
    pub pairs: Vec<PairDefinition>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Llr {
    #[serde(default = "n_bins_default")]
    pub n_bins: usize,
    #[serde(default = "feature_types_default")]
    pub feature_types: Vec<String>,
    #[serde(default = "display_bound_default")]
    pub display_bound: f64,
    #[serde(default = "BTreeMap::new")]
    pub extra_ranges: BTreeMap<String, (f64, f64)>,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).expect("every General field has a default")
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).expect("every Data field has a default")
    }
}

impl Default for Llr {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).expect("every Llr field has a default")
    }
}

impl Default for Param {
    fn default() -> Self {
        Param { general: General::default(), data: Data::default(), llr: Llr::default(), tag: String::new() }
    }
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }

    /// Range table for this run: the built-in feature types plus `llr.extra_ranges`.
    pub fn range_policy(&self) -> Result<RangePolicy, String> {
        let mut policy = RangePolicy::new(self.llr.n_bins);
        for (tag, &(lo, hi)) in &self.llr.extra_ranges {
            policy.register(tag, lo, hi).map_err(|e| format!("llr.extra_ranges.{}: {}", tag, e))?;
        }
        Ok(policy)
    }
}

/// Reads a parameter file, YAML unless the extension is `.toml`.
pub fn get(param_file: String) -> Result<Param, Box<dyn Error>> {
    let path = Path::new(&param_file);
    let mut reader = BufReader::new(File::open(path)?);

    let mut config: Param = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            let mut content = String::new();
            reader.read_to_string(&mut content)?;
            toml::from_str(&content)?
        }
        _ => serde_yaml::from_reader(reader)?,
    };
    config.tag = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();

    validate(&mut config)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<(), String> {
    if !param.general.log_base.is_empty() {
        param.general.display_colorful = false;
    }

    if param.general.thread_number == 0 {
        return Err("Invalid thread_number=0. At least one thread is required.".to_string());
    }

    if param.llr.n_bins == 0 {
        return Err("Invalid n_bins=0. At least one bin per axis is required.".to_string());
    }

    if !(param.llr.display_bound > 0.0) {
        return Err(format!("Invalid display_bound={:.3}. Must be > 0.", param.llr.display_bound));
    }

    if param.llr.feature_types.is_empty() {
        return Err("No feature type requested (llr.feature_types is empty).".to_string());
    }

    // built-in tags are accepted in any case
    for feature_type in param.llr.feature_types.iter_mut() {
        if let Ok(known) = feature_type.parse::<FeatureType>() {
            *feature_type = known.tag().to_string();
        }
    }

    let policy = param.range_policy()?;
    for feature_type in &param.llr.feature_types {
        policy.resolve(feature_type).map_err(|e| e.to_string())?;
    }

    validate_pairs(param)?;

    if param.data.class_column.is_empty() {
        return Err("data.class_column must name the label column.".to_string());
    }

    if param.llr.n_bins > 200 {
        warn!(
            "n_bins={} gives {} cells per surface: most cells will be empty for typical class sizes \
            and the log-ratio will be dominated by the smoothing terms.",
            param.llr.n_bins,
            param.llr.n_bins * param.llr.n_bins
        );
    }

    Ok(())
}

fn validate_pairs(param: &Param) -> Result<(), String> {
    let mut seen = HashSet::new();
    for pair in &param.data.pairs {
        if pair.name.is_empty() || pair.rna.is_empty() || pair.protein.is_empty() {
            return Err(format!("Incomplete pair definition {:?}: name, rna and protein are required.", pair));
        }
        if !seen.insert(pair.name.as_str()) {
            return Err(format!("Duplicated pair name '{}'.", pair.name));
        }
    }
    Ok(())
}

// Default value definitions

fn empty_string() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn class_column_default() -> String {
    "Class".to_string()
}
fn n_bins_default() -> usize {
    DEFAULT_N_BINS
}
fn feature_types_default() -> Vec<String> {
    crate::string_vec!["CC"]
}
fn display_bound_default() -> f64 {
    DISPLAY_LOG_RATIO_BOUND
}
fn true_default() -> bool {
    true
}
fn one_default() -> usize {
    1
}
fn uzero_default() -> usize {
    0
}
