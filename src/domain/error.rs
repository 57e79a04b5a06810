// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// One error enum per pipeline stage. The application layer
// wraps these in anyhow::Error with extra context; nothing
// here is retried, every error aborts the run.

use thiserror::Error;

/// Errors raised while reading or filtering the corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus is missing required column '{column}' (found: {found})")]
    MissingColumn { column: String, found: String },

    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidField { row: usize, column: String, value: String },

    #[error("no authors survived filtering ({rows} rows read, {kept} kept by the newline filter)")]
    NoAuthorsSurvived { rows: usize, kept: usize },

    #[error("author '{0}' is not present in the label map")]
    UnmappedAuthor(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Errors raised by the stratified splitter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(String),

    #[error("cannot split an empty sample set")]
    Empty,

    #[error("class {label} has only {count} member(s); stratification needs at least 2")]
    ClassTooSmall { label: usize, count: usize },

    #[error("test size {test_size} is smaller than the number of classes ({classes})")]
    TestSizeTooSmall { test_size: usize, classes: usize },

    #[error("train size {train_size} is smaller than the number of classes ({classes})")]
    TrainSizeTooSmall { train_size: usize, classes: usize },
}

/// Errors raised while turning text into fixed-length token sequences.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("max length must be at least 2 to hold the boundary tokens, got {0}")]
    MaxLenTooSmall(usize),

    #[error("tokenizer has no '{0}' token")]
    MissingSpecialToken(&'static str),

    #[error("tokenisation failed: {0}")]
    Tokenizer(String),
}

/// Errors raised while building the evaluation report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("got {logits} prediction rows for {samples} samples")]
    LengthMismatch { logits: usize, samples: usize },

    #[error("predicted label {0} is not in the label map")]
    UnknownLabel(usize),

    #[error("cannot evaluate an empty split")]
    EmptySplit,
}
