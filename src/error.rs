//! Typed errors for the scoring library

use thiserror::Error;

/// Structural problems when building a [`crate::Dataset`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Row {row} has {actual} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Column {column} has {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

/// Problems with a feature contract declaration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("Feature contract declares no expected columns")]
    Empty,

    #[error("Expected column declared twice: {0}")]
    DuplicateColumn(String),

    #[error("Categorical column {0} is not one of the expected columns")]
    UndeclaredCategorical(String),
}

/// Failures raised by a classifier, either while loading or during inference
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Invalid feature contract: {0}")]
    Contract(#[from] ContractError),

    #[error("Value in column {column} at row {row} is not numeric")]
    NonNumeric { column: String, row: usize },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Hard failures of the scoring pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Scoring failed: {0}")]
    Scoring(#[source] ModelError),

    #[error("Internal table error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Failures while reading or writing tabular files
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Invalid dataset: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Failures while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read the configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse the configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Default model {0} is not declared under [models]")]
    UnknownDefaultModel(String),
}
