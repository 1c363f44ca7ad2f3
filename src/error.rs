//! Error types shared by every stage of the analysis pipeline.

use thiserror::Error;

/// Errors raised while reading, configuring or analysing an event log.
///
/// All of them are fatal for the current run: inputs are static files, so
/// retrying would fail the same way.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input is not a readable event log (missing columns, bad cells,
    /// directory instead of a file).
    #[error("format error: {0}")]
    Format(String),
    /// A configuration value or configuration file is unusable.
    #[error("config error: {0}")]
    Config(String),
    /// A caller-supplied argument is out of range.
    #[error("argument error: {0}")]
    Argument(String),
    /// Clustering preconditions were violated.
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Precondition failures detected before k-means starts iterating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("cannot form {k} clusters from {n} points")]
    InsufficientPoints { n: usize, k: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn missing_columns(source: &str, missing: &[&str]) -> Self {
        AnalysisError::Format(format!(
            "{source} is not of the correct format: missing column(s) {}",
            missing.join(", ")
        ))
    }
}
