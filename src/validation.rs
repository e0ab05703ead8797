//! Advisory schema checks of a dataset against a feature contract

use std::fmt;

use serde::Serialize;

use crate::contract::FeatureContract;
use crate::dataset::Dataset;

/// One schema or type problem found by [`validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "columns")]
pub enum ValidationIssue {
    /// Every expected column absent from the dataset, in contract order
    MissingColumns(Vec<String>),
    /// A categorical column holding at least one non-string value
    WrongCategoricalType(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingColumns(names) => {
                write!(f, "Missing columns: {}", names.join(", "))
            }
            ValidationIssue::WrongCategoricalType(name) => {
                write!(f, "The feature '{}' is not of string type", name)
            }
        }
    }
}

/// Columns of the contract that `dataset` does not have, in contract order
pub fn missing_columns(dataset: &Dataset, contract: &FeatureContract) -> Vec<String> {
    contract
        .expected_columns()
        .iter()
        .filter(|name| !dataset.has_column(name))
        .cloned()
        .collect()
}

/// Check `dataset` against `contract`
///
/// Returns the missing-columns issue first (at most one), followed by one
/// issue per categorical column with non-string values, in the order the
/// contract declares them. Nulls are ignored by the type check. An empty
/// result means the dataset is admissible for scoring.
pub fn validate(dataset: &Dataset, contract: &FeatureContract) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let missing = missing_columns(dataset, contract);
    if !missing.is_empty() {
        issues.push(ValidationIssue::MissingColumns(missing));
    }

    for name in contract.categorical_columns() {
        let Some(mut values) = dataset.column_values(name) else {
            continue;
        };
        if values.any(|v| !v.is_null() && !v.is_string_typed()) {
            issues.push(ValidationIssue::WrongCategoricalType(name.clone()));
        }
    }

    tracing::debug!(
        rows = dataset.n_rows(),
        issues = issues.len(),
        "Validated dataset against feature contract"
    );

    issues
}
