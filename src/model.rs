//! Classifier seam and the file-backed scorecard model

use std::collections::{HashMap, HashSet};
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Deserialize;
use tracing::info;

use crate::contract::FeatureContract;
use crate::dataset::Value;
use crate::error::ModelError;
use crate::pipeline::PreparedMatrix;

/// A pre-trained binary attrition classifier
///
/// Both inference calls return one value per row of the matrix, in row order.
pub trait Classifier {
    fn name(&self) -> &str;

    /// Columns the model was trained on, and which of them are categorical
    fn feature_contract(&self) -> &FeatureContract;

    /// Positive-class probability per row, in [0, 1]
    fn predict_probability(&self, matrix: &PreparedMatrix) -> Result<Vec<f64>, ModelError>;

    /// Hard attrition decision per row
    fn predict_label(&self, matrix: &PreparedMatrix) -> Result<Vec<bool>, ModelError>;
}

/// On-disk layout of a scorecard artifact
#[derive(Debug, Clone, Deserialize)]
struct ScorecardArtifact {
    name: String,
    features: Vec<String>,
    #[serde(default)]
    categorical_features: Vec<String>,
    intercept: f64,
    #[serde(default)]
    coefficients: HashMap<String, f64>,
    #[serde(default)]
    levels: HashMap<String, HashMap<String, f64>>,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Logistic scorecard: numeric features carry a coefficient, categorical
/// features carry one weight per level (unseen levels weigh 0)
#[derive(Debug, Clone)]
pub struct ScorecardModel {
    name: String,
    contract: FeatureContract,
    intercept: f64,
    /// Coefficient per contract column; 1.0 for categorical columns
    weights: Array1<f64>,
    levels: Vec<HashMap<String, f64>>,
    threshold: f64,
}

impl ScorecardModel {
    /// Parse and check a JSON scorecard
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: ScorecardArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ScorecardArtifact) -> Result<Self, ModelError> {
        let ScorecardArtifact {
            name,
            features,
            categorical_features,
            intercept,
            mut coefficients,
            mut levels,
            threshold,
        } = artifact;

        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ModelError::InvalidArtifact(format!(
                "threshold {} must lie strictly between 0 and 1",
                threshold
            )));
        }
        if !intercept.is_finite() {
            return Err(ModelError::InvalidArtifact("intercept is not finite".into()));
        }

        let contract = FeatureContract::new(features, categorical_features)?;
        let known: HashSet<&str> = contract
            .expected_columns()
            .iter()
            .map(String::as_str)
            .collect();

        if let Some(name) = coefficients.keys().find(|k| !known.contains(k.as_str())) {
            return Err(ModelError::InvalidArtifact(format!(
                "coefficient for unknown feature {}",
                name
            )));
        }
        if let Some(name) = levels.keys().find(|k| !known.contains(k.as_str())) {
            return Err(ModelError::InvalidArtifact(format!(
                "levels for unknown feature {}",
                name
            )));
        }
        if let Some(name) = coefficients.keys().find(|k| contract.is_categorical(k)) {
            return Err(ModelError::InvalidArtifact(format!(
                "categorical feature {} must use levels, not a coefficient",
                name
            )));
        }
        if let Some(name) = levels.keys().find(|k| !contract.is_categorical(k)) {
            return Err(ModelError::InvalidArtifact(format!(
                "numeric feature {} cannot declare levels",
                name
            )));
        }

        let mut weights = Vec::with_capacity(contract.expected_columns().len());
        let mut level_tables = Vec::with_capacity(contract.expected_columns().len());
        for column in contract.expected_columns() {
            if contract.is_categorical(column) {
                weights.push(1.0);
                level_tables.push(levels.remove(column).unwrap_or_default());
            } else {
                weights.push(coefficients.remove(column).unwrap_or(0.0));
                level_tables.push(HashMap::new());
            }
        }

        Ok(Self {
            name,
            contract,
            intercept,
            weights: Array1::from(weights),
            levels: level_tables,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Design matrix: numeric cells as-is, categorical cells as level weights
    fn design_matrix(&self, matrix: &PreparedMatrix) -> Result<Array2<f64>, ModelError> {
        let expected = self.contract.expected_columns();
        if matrix.columns() != expected {
            return Err(ModelError::Inference(format!(
                "matrix columns [{}] do not match model features [{}]",
                matrix.columns().join(", "),
                expected.join(", ")
            )));
        }

        let mut x = Array2::<f64>::zeros((matrix.n_rows(), expected.len()));
        for (row_idx, row) in matrix.rows().iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                x[[row_idx, col_idx]] = if matrix.is_categorical(col_idx) {
                    let level = match value {
                        Value::Str(s) => s.as_str(),
                        _ => "",
                    };
                    self.levels[col_idx].get(level).copied().unwrap_or(0.0)
                } else {
                    value.as_f64().ok_or_else(|| ModelError::NonNumeric {
                        column: expected[col_idx].clone(),
                        row: row_idx,
                    })?
                };
            }
        }
        Ok(x)
    }
}

impl Classifier for ScorecardModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_contract(&self) -> &FeatureContract {
        &self.contract
    }

    fn predict_probability(&self, matrix: &PreparedMatrix) -> Result<Vec<f64>, ModelError> {
        let x = self.design_matrix(matrix)?;
        let logits = x.dot(&self.weights) + self.intercept;
        Ok(logits.iter().map(|&z| sigmoid(z)).collect())
    }

    fn predict_label(&self, matrix: &PreparedMatrix) -> Result<Vec<bool>, ModelError> {
        Ok(self
            .predict_probability(matrix)?
            .into_iter()
            .map(|p| p >= self.threshold)
            .collect())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Load a scorecard artifact from disk
///
/// # Arguments
/// * `path` - Path to the JSON scorecard
///
/// # Returns
/// * Validated `ScorecardModel` ready for inference
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ScorecardModel, ModelError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let model = ScorecardModel::from_json(&json)?;
    info!(
        model = model.name(),
        path = %path.display(),
        features = model.contract.expected_columns().len(),
        "Loaded scorecard model"
    );
    Ok(model)
}
