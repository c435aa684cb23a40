pub mod binner;
pub mod data;
pub mod datasets;
pub mod error;
pub mod export;
pub mod llr;
pub mod param;
pub mod range;
pub mod report;
pub mod utils;

use crate::data::FeatureTable;
use crate::datasets::ExpressionDatasets;
use crate::error::LlrError;
use crate::export::{GridExporter, PairSink};
use crate::llr::{joint_llr, marginal};
use crate::param::{PairDefinition, Param};
use crate::range::RangePolicy;
use crate::report::{JobFailure, PairReport, Report};
use chrono::Local;
use log::{debug, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn version() -> String {
    format!("{}#{}", env!("CARGO_PKG_VERSION"), option_env!("GENEPAIR_LLR_GIT_SHA").unwrap_or("unknown"))
}

/// Marginal densities and joint log-likelihood ratio of one pair for one feature type.
pub fn analyse_pair(table: &FeatureTable, pair: &PairDefinition, feature_type: &str, policy: &RangePolicy) -> Result<PairReport, LlrError> {
    let range = policy.resolve(feature_type)?;
    let rna_feature = pair.rna_feature(feature_type);
    let protein_feature = pair.protein_feature(feature_type);

    let (rna_values, rna_labels) = table.labeled_sample(&rna_feature)?;
    let rna_marginal = marginal(&rna_values, &rna_labels, &range)?;
    let (protein_values, protein_labels) = table.labeled_sample(&protein_feature)?;
    let protein_marginal = marginal(&protein_values, &protein_labels, &range)?;

    let (rna, pro, labels) = table.complete_pairs(&rna_feature, &protein_feature)?;
    let joint = joint_llr(&rna, &pro, &labels, &range)?;
    let summary = joint.summary();

    Ok(PairReport {
        pair: pair.name.clone(),
        feature_type: feature_type.to_string(),
        rna_feature,
        protein_feature,
        rna_marginal,
        protein_marginal,
        joint,
        summary,
    })
}

/// Loads the inputs named in `param` and analyses every pair.
pub fn run(param: &Param, interrupted: Arc<AtomicBool>) -> Result<Report, Box<dyn Error>> {
    let table = FeatureTable::load(&param.data.features, &param.data.class_column, &param.data.id_column)?;
    cinfo!(param.general.display_colorful, "\x1b[2;97m{:?}\x1b[0m", table);

    let mut report = run_on_table(&table, param, interrupted)?;

    if !param.data.datasets.is_empty() {
        let datasets = ExpressionDatasets::load(&param.data.datasets, param.data.min_sample_count)?;
        cinfo!(param.general.display_colorful, "{} datasets kept (min_sample_count={})", datasets.datasets.len(), param.data.min_sample_count);
        report.datasets = datasets.summaries();
    }

    if !param.general.output_dir.is_empty() {
        let mut exporter = GridExporter::new(&param.general.output_dir, param.llr.display_bound)?;
        for pair_report in &report.pairs {
            exporter.emit(pair_report)?;
        }
        cinfo!(param.general.display_colorful, "{} surfaces written to {}", report.pairs.len(), param.general.output_dir);
    }

    Ok(report)
}

/// Analyses every (pair, feature type) job of `param` on an already loaded table.
///
/// Jobs run on a pool of `general.thread_number` threads. A job failing with an
/// `LlrError` (missing column, empty class, ...) is logged and recorded in
/// `Report::failures`; the other jobs go on. Jobs not started when
/// `interrupted` is raised are skipped.
pub fn run_on_table(table: &FeatureTable, param: &Param, interrupted: Arc<AtomicBool>) -> Result<Report, Box<dyn Error>> {
    let start = std::time::Instant::now();
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let policy = param.range_policy()?;

    let jobs: Vec<(&PairDefinition, &str)> = param
        .data
        .pairs
        .iter()
        .flat_map(|pair| param.llr.feature_types.iter().map(move |ft| (pair, ft.as_str())))
        .collect();
    cinfo!(param.general.display_colorful, "Estimating {} pair surfaces ({} bins per axis)", jobs.len(), policy.n_bins());

    let pool = ThreadPoolBuilder::new().num_threads(param.general.thread_number).build()?;

    let outcomes: Vec<Option<Result<PairReport, JobFailure>>> = pool.install(|| {
        jobs.par_iter()
            .map(|&(pair, feature_type)| {
                if interrupted.load(Ordering::Relaxed) {
                    return None;
                }
                debug!("Analysing {} ({})", pair.name, feature_type);
                Some(analyse_pair(table, pair, feature_type, &policy).map_err(|e| {
                    warn!("Skipping {} ({}): {}", pair.name, feature_type, e);
                    JobFailure { pair: pair.name.clone(), feature_type: feature_type.to_string(), reason: e.to_string() }
                }))
            })
            .collect()
    });

    let skipped = outcomes.iter().filter(|o| o.is_none()).count();
    if skipped > 0 {
        warn!("Interrupted: {} jobs were not run", skipped);
    }

    let mut pairs = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            Ok(pair_report) => pairs.push(pair_report),
            Err(failure) => failures.push(failure),
        }
    }

    let stem = Path::new(&param.general.save_report).file_stem().and_then(|s| s.to_str()).unwrap_or("llr");
    Ok(Report {
        id: format!("{}_{}", stem, timestamp),
        version: version(),
        timestamp,
        parameters: param.clone(),
        n_rows: table.row_len,
        pairs,
        failures,
        datasets: Vec::new(),
        execution_time: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str) -> PairDefinition {
        PairDefinition { name: name.to_string(), rna: format!("{}_RNA", name), protein: format!("{}_PRO", name) }
    }

    fn create_test_table() -> FeatureTable {
        FeatureTable::from_columns(
            vec![0, 1, 0, 1, 0, 1, 0, 1],
            vec![
                ("A_RNA_CC", vec![-0.5, 0.8, -0.3, 0.7, 0.0, 0.9, -0.1, f64::NAN]),
                ("A_PRO_CC", vec![-0.4, 0.7, -0.2, 0.6, 0.1, 0.8, -0.3, 0.5]),
                ("A_RNA_MR", vec![0.9, 0.1, 0.8, 0.2, 0.7, 0.1, 0.6, 0.3]),
                ("A_PRO_MR", vec![0.8, 0.2, 0.9, 0.1, 0.6, 0.2, 0.7, 0.2]),
                // no complete positive row
                ("B_RNA_CC", vec![0.1, f64::NAN, 0.2, f64::NAN, 0.3, f64::NAN, 0.4, f64::NAN]),
                ("B_PRO_CC", vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_analyse_pair() {
        let table = create_test_table();
        let report = analyse_pair(&table, &pair("A"), "CC", &RangePolicy::new(2)).unwrap();
        assert_eq!(report.rna_feature, "A_RNA_CC");
        assert_eq!(report.rna_marginal.n_positive, 3, "the missing RNA value is left out of the marginal");
        assert_eq!(report.protein_marginal.n_positive, 4, "the protein marginal keeps its own complete values");
        assert_eq!(report.joint.n_positive, 3);
        assert_eq!(report.joint.n_negative, 4);
        assert!(report.joint.log_ratio[1][1] > 0.0, "positives sit in the high/high cell");
        assert!(report.joint.log_ratio[0][0] < 0.0, "negatives sit in the low/low cell");
    }

    #[test]
    fn test_analyse_pair_errors() {
        let table = create_test_table();
        assert_eq!(analyse_pair(&table, &pair("B"), "CC", &RangePolicy::default()).unwrap_err(), LlrError::EmptyClass { class: 1 });
        assert_eq!(analyse_pair(&table, &pair("B"), "MR", &RangePolicy::default()).unwrap_err(), LlrError::MissingColumn { name: "B_RNA_MR".to_string() });
        assert_eq!(analyse_pair(&table, &pair("A"), "XX", &RangePolicy::default()).unwrap_err(), LlrError::InvalidRange { tag: "XX".to_string() });
    }

    #[test]
    fn test_run_on_table_collects_failures() {
        let table = create_test_table();
        let mut param = Param::default();
        param.general.thread_number = 2;
        param.general.display_colorful = false;
        param.llr.n_bins = 4;
        param.llr.feature_types = vec!["CC".to_string(), "MR".to_string()];
        param.data.pairs = vec![pair("A"), pair("B")];

        let report = run_on_table(&table, &param, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(report.pairs.len(), 2, "A succeeds for both feature types");
        assert_eq!(report.failures.len(), 2, "B fails for both feature types");
        assert!(report.find("A", "MR").is_some());
        assert!(report.failures.iter().any(|f| f.pair == "B" && f.reason.contains("no observations")));
        assert!(report.id.starts_with("llr_"));
        assert_eq!(report.n_rows, 8);
    }

    #[test]
    fn test_report_id_uses_file_stem_of_save_path() {
        let table = create_test_table();
        let mut param = Param::default();
        param.data.pairs = vec![pair("A")];

        for (save_report, prefix) in [("./out/run.json", "run_"), ("res/v1.2/run.bin", "run_"), ("", "llr_")] {
            param.general.save_report = save_report.to_string();
            let report = run_on_table(&table, &param, Arc::new(AtomicBool::new(false))).unwrap();
            assert!(report.id.starts_with(prefix), "{} should give an id starting with {}, got {}", save_report, prefix, report.id);
            assert!(!report.id.contains('/'));
        }
    }

    #[test]
    fn test_run_on_table_interrupted_skips_jobs() {
        let table = create_test_table();
        let mut param = Param::default();
        param.data.pairs = vec![pair("A")];
        let report = run_on_table(&table, &param, Arc::new(AtomicBool::new(true))).unwrap();
        assert!(report.pairs.is_empty());
        assert!(report.failures.is_empty());
    }
}
