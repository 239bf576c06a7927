use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code("FRAMEBENCH-001"),
        help("Please check the benchmark YAML file and command-line overrides.")
    )]
    ConfigError(#[source] serde_yaml::Error, #[label("here")] Option<SourceSpan>),

    #[error("I/O error: {0}")]
    #[diagnostic(code("FRAMEBENCH-002"), help("Check file paths and permissions."))]
    IoError(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    #[diagnostic(
        code("FRAMEBENCH-003"),
        help("An error occurred within the data frame engine.")
    )]
    PolarsError(#[from] polars::error::PolarsError),

    #[error("Column '{column}' contains {count} null values")]
    #[diagnostic(
        code("FRAMEBENCH-004"),
        help("Sequence conversion needs a column without nulls.")
    )]
    NullValues { column: String, count: usize },

    #[error("Key '{key}' not found in index over column '{column}'")]
    #[diagnostic(code("FRAMEBENCH-005"))]
    KeyNotFound { column: String, key: String },

    #[error("Candidates disagree: '{left}' and '{right}' returned different results")]
    #[diagnostic(
        code("FRAMEBENCH-006"),
        help("Every candidate of one benchmark must compute the same result.")
    )]
    CandidateMismatch { left: String, right: String },

    #[error("Invalid date code '{0}', expected YYYY/MM")]
    #[diagnostic(code("FRAMEBENCH-007"))]
    InvalidCode(String),

    #[error(transparent)]
    #[diagnostic(code("FRAMEBENCH-000"))]
    Unknown(#[from] anyhow::Error),
}

impl BenchError {
    /// Configuration error built from a plain message.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        use serde::de::Error;
        BenchError::ConfigError(serde_yaml::Error::custom(msg), None)
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
