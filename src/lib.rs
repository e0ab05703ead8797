//! churnscore: customer attrition scoring against a pre-trained classifier
//!
//! This library validates customer tables against a classifier's feature
//! contract, prepares them for inference and produces scored, exportable
//! results with summary aggregates.

pub mod cli;
pub mod config;
pub mod contract;
pub mod data;
pub mod dataset;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod validation;
pub mod viz;

// Re-export public items for easier access
pub use cli::{Args, Command};
pub use config::Config;
pub use contract::FeatureContract;
pub use data::{export_results, load_dataset, write_summary_report};
pub use dataset::{Dataset, Value};
pub use error::{ContractError, DatasetError, ModelError, PipelineError, SourceError};
pub use model::{load_model, Classifier, ScorecardModel};
pub use pipeline::{
    prepare_for_inference, score, score_with_id_column, PreparedMatrix, ScoringResult,
    ScoringSummary,
};
pub use validation::{validate, ValidationIssue};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
