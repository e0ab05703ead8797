//! Feature contract shared by a classifier and the datasets it scores

use std::collections::HashSet;

use crate::error::ContractError;

/// Ordered model input columns plus the subset treated as categorical
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureContract {
    expected_columns: Vec<String>,
    categorical_columns: Vec<String>,
}

impl FeatureContract {
    pub fn new<E, C>(expected_columns: E, categorical_columns: C) -> Result<Self, ContractError>
    where
        E: IntoIterator,
        E::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let expected_columns: Vec<String> = expected_columns.into_iter().map(Into::into).collect();
        let categorical_columns: Vec<String> =
            categorical_columns.into_iter().map(Into::into).collect();

        if expected_columns.is_empty() {
            return Err(ContractError::Empty);
        }

        let mut seen = HashSet::with_capacity(expected_columns.len());
        for name in &expected_columns {
            if !seen.insert(name.as_str()) {
                return Err(ContractError::DuplicateColumn(name.clone()));
            }
        }

        if let Some(name) = categorical_columns
            .iter()
            .find(|name| !seen.contains(name.as_str()))
        {
            return Err(ContractError::UndeclaredCategorical(name.clone()));
        }

        Ok(Self {
            expected_columns,
            categorical_columns,
        })
    }

    pub fn expected_columns(&self) -> &[String] {
        &self.expected_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical_columns.iter().any(|c| c == column)
    }
}
