use thiserror::Error;

/// Failures of the binning / likelihood-ratio core.
///
/// Whether a failure aborts a run or skips a single feature pair is decided
/// by the caller (see `crate::run_on_table`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlrError {
    #[error("no range policy registered for feature type '{tag}'")]
    InvalidRange { tag: String },

    #[error("class {class} has no observations: the likelihood ratio is undefined")]
    EmptyClass { class: u8 },

    #[error("paired samples differ in length ({left} vs {right})")]
    ShapeMismatch { left: usize, right: usize },

    #[error("column '{name}' is missing from the feature table")]
    MissingColumn { name: String },

    #[error("invalid binning: {0}")]
    InvalidBins(String),
}
