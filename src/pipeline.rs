//! Inference preparation and scoring of customer datasets

use serde::Serialize;
use tracing::{debug, info};

use crate::contract::FeatureContract;
use crate::dataset::{Dataset, Value};
use crate::error::{ModelError, PipelineError};
use crate::model::Classifier;
use crate::validation::missing_columns;

/// Identifier column kept as the leading column of scored output
pub const ID_CLIENT_COLUMN: &str = "ID client";
/// Attrition probability, as a percentage
pub const PROBABILITY_COLUMN: &str = "Attrition_Prob";
/// Hard attrition decision
pub const PREDICTION_COLUMN: &str = "Attrition_Predite";

/// Model input: exactly the contract columns, coerced and imputed
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMatrix {
    table: Dataset,
    categorical: Vec<bool>,
}

impl PreparedMatrix {
    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        self.table.rows()
    }

    pub fn n_rows(&self) -> usize {
        self.table.n_rows()
    }

    pub fn is_categorical(&self, column_idx: usize) -> bool {
        self.categorical.get(column_idx).copied().unwrap_or(false)
    }

    pub fn as_dataset(&self) -> &Dataset {
        &self.table
    }
}

/// Restrict `dataset` to the contract and make it ready for inference
///
/// Columns are selected in contract order, categorical values become
/// strings, and nulls become `"0"` (categorical) or `0` (otherwise).
pub fn prepare_for_inference(
    dataset: &Dataset,
    contract: &FeatureContract,
) -> Result<PreparedMatrix, PipelineError> {
    let missing = missing_columns(dataset, contract);
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let selected = dataset.select(contract.expected_columns())?;
    let categorical: Vec<bool> = selected
        .columns()
        .iter()
        .map(|name| contract.is_categorical(name))
        .collect();

    let rows = selected
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&categorical)
                .map(|(value, &is_categorical)| prepare_cell(value, is_categorical))
                .collect()
        })
        .collect();
    let table = Dataset::new(selected.columns().to_vec(), rows)?;

    debug!(
        rows = table.n_rows(),
        columns = table.n_columns(),
        "Prepared inference matrix"
    );

    Ok(PreparedMatrix { table, categorical })
}

fn prepare_cell(value: &Value, is_categorical: bool) -> Value {
    match (value, is_categorical) {
        (Value::Null, true) => Value::Str("0".to_string()),
        (Value::Null, false) => Value::Int(0),
        (Value::Str(_), _) | (_, false) => value.clone(),
        (Value::Float(f), true) => Value::Str(float_level(*f)),
        (other, true) => Value::Str(other.to_string()),
    }
}

/// Category label of a float cell; integral values keep a trailing `.0`
fn float_level(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Aggregates over a scored table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringSummary {
    pub total_rows: usize,
    pub at_risk_count: usize,
    /// Percentage of rows predicted to churn; 0 for an empty table
    pub attrition_rate: f64,
}

impl ScoringSummary {
    pub fn from_labels(labels: &[bool]) -> Self {
        let total_rows = labels.len();
        let at_risk_count = labels.iter().filter(|&&l| l).count();
        let attrition_rate = if total_rows > 0 {
            at_risk_count as f64 / total_rows as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_rows,
            at_risk_count,
            attrition_rate,
        }
    }
}

/// One output row: the original values plus the two derived fields
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow<'a> {
    pub values: Vec<(&'a str, &'a Value)>,
    pub attrition_probability: f64,
    pub attrition_predicted: bool,
}

/// Scored table together with its summary aggregates
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringResult {
    pub table: Dataset,
    /// Percent-scaled probabilities, in input row order
    pub probabilities: Vec<f64>,
    pub labels: Vec<bool>,
    pub summary: ScoringSummary,
}

impl ScoringResult {
    /// Row views over the scored table, excluding the two derived columns
    pub fn scored_rows(&self) -> impl Iterator<Item = ScoredRow<'_>> + '_ {
        let columns = self.table.columns();
        self.table
            .rows()
            .iter()
            .zip(self.probabilities.iter().zip(&self.labels))
            .map(move |(row, (&probability, &label))| ScoredRow {
                values: columns
                    .iter()
                    .zip(row)
                    .filter(|(name, _)| {
                        name.as_str() != PROBABILITY_COLUMN && name.as_str() != PREDICTION_COLUMN
                    })
                    .map(|(name, value)| (name.as_str(), value))
                    .collect(),
                attrition_probability: probability,
                attrition_predicted: label,
            })
    }
}

/// Score `dataset`, keeping the `ID client` column in front when present
pub fn score<C>(dataset: &Dataset, classifier: &C) -> Result<ScoringResult, PipelineError>
where
    C: Classifier + ?Sized,
{
    score_with_id_column(dataset, classifier, Some(ID_CLIENT_COLUMN))
}

/// Score `dataset`, optionally moving `id_column` to the front of the output
///
/// Missing contract columns fail with [`PipelineError::Schema`]. Inference
/// failures, length mismatches and out-of-range probabilities fail with
/// [`PipelineError::Scoring`]. Nothing is returned partially.
pub fn score_with_id_column<C>(
    dataset: &Dataset,
    classifier: &C,
    id_column: Option<&str>,
) -> Result<ScoringResult, PipelineError>
where
    C: Classifier + ?Sized,
{
    let matrix = prepare_for_inference(dataset, classifier.feature_contract())?;

    let probabilities = classifier
        .predict_probability(&matrix)
        .map_err(PipelineError::Scoring)?;
    let labels = classifier
        .predict_label(&matrix)
        .map_err(PipelineError::Scoring)?;

    check_output_len("predict_probability", probabilities.len(), dataset.n_rows())?;
    check_output_len("predict_label", labels.len(), dataset.n_rows())?;

    if let Some((row, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || !(0.0..=1.0).contains(*p))
    {
        return Err(PipelineError::Scoring(ModelError::Inference(format!(
            "probability {} at row {} is outside [0, 1]",
            p, row
        ))));
    }

    let percentages: Vec<f64> = probabilities.iter().map(|p| p * 100.0).collect();

    let mut table = dataset
        .with_column(
            PROBABILITY_COLUMN,
            percentages.iter().copied().map(Value::Float).collect(),
        )?
        .with_column(
            PREDICTION_COLUMN,
            labels.iter().copied().map(Value::Bool).collect(),
        )?;

    if let Some(id) = id_column {
        if table.column_index(id).is_some_and(|idx| idx > 0) {
            table = table.move_column_to_front(id)?;
        }
    }

    let summary = ScoringSummary::from_labels(&labels);
    info!(
        model = classifier.name(),
        total = summary.total_rows,
        at_risk = summary.at_risk_count,
        "Scored dataset"
    );

    Ok(ScoringResult {
        table,
        probabilities: percentages,
        labels,
        summary,
    })
}

fn check_output_len(capability: &str, actual: usize, expected: usize) -> Result<(), PipelineError> {
    if actual != expected {
        return Err(PipelineError::Scoring(ModelError::Inference(format!(
            "{} returned {} values for {} rows",
            capability, actual, expected
        ))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Inference call made to fail
    #[derive(Clone, Copy, PartialEq)]
    enum FailingCall {
        Probability,
        Label,
    }

    /// Classifier replaying fixed outputs
    struct FixedClassifier {
        contract: FeatureContract,
        probabilities: Vec<f64>,
        threshold: f64,
        calls: Cell<usize>,
        failing: Option<FailingCall>,
    }

    impl FixedClassifier {
        fn new(probabilities: Vec<f64>) -> Self {
            Self {
                contract: FeatureContract::new(
                    ["Niveau_Service_Regroupe", "Statut", "Type Personne"],
                    ["Niveau_Service_Regroupe", "Statut", "Type Personne"],
                )
                .unwrap(),
                probabilities,
                threshold: 0.5,
                calls: Cell::new(0),
                failing: None,
            }
        }

        fn failing_on(mut self, call: FailingCall) -> Self {
            self.failing = Some(call);
            self
        }

        fn check(&self, call: FailingCall) -> Result<(), ModelError> {
            self.calls.set(self.calls.get() + 1);
            if self.failing == Some(call) {
                return Err(ModelError::Inference("model backend unavailable".into()));
            }
            Ok(())
        }
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn feature_contract(&self) -> &FeatureContract {
            &self.contract
        }

        fn predict_probability(&self, matrix: &PreparedMatrix) -> Result<Vec<f64>, ModelError> {
            self.check(FailingCall::Probability)?;
            Ok(self.probabilities.iter().take(matrix.n_rows()).copied().collect())
        }

        fn predict_label(&self, matrix: &PreparedMatrix) -> Result<Vec<bool>, ModelError> {
            self.check(FailingCall::Label)?;
            Ok(self
                .probabilities
                .iter()
                .take(matrix.n_rows())
                .map(|&p| p >= self.threshold)
                .collect())
        }
    }

    fn dataset(n_rows: usize) -> Dataset {
        let rows = (0..n_rows)
            .map(|i| {
                vec![
                    Value::from(format!("Premium{}", i % 2)),
                    Value::from(format!("C{}", i)),
                    Value::from("Actif"),
                    Value::from("Physique"),
                    Value::Int(i as i64),
                ]
            })
            .collect();
        Dataset::new(
            vec![
                "Niveau_Service_Regroupe".into(),
                "ID client".into(),
                "Statut".into(),
                "Type Personne".into(),
                "Extra".into(),
            ],
            rows,
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_selects_contract_columns_in_order() {
        let classifier = FixedClassifier::new(vec![]);
        let matrix = prepare_for_inference(&dataset(3), classifier.feature_contract()).unwrap();
        assert_eq!(matrix.columns(), classifier.feature_contract().expected_columns());
        assert_eq!(matrix.n_rows(), 3);
        assert!(matrix.is_categorical(0));
    }

    #[test]
    fn test_prepare_coerces_and_imputes() {
        let contract = FeatureContract::new(["Statut", "Anciennete"], ["Statut"]).unwrap();
        let ds = Dataset::new(
            vec!["Anciennete".into(), "Statut".into()],
            vec![
                vec![Value::Null, Value::Int(5)],
                vec![Value::Float(1.5), Value::Null],
                vec![Value::Int(3), Value::from("Actif")],
            ],
        )
        .unwrap();

        let matrix = prepare_for_inference(&ds, &contract).unwrap();
        let t = matrix.as_dataset();
        assert_eq!(t.value(0, "Statut"), Some(&Value::from("5")));
        assert_eq!(t.value(1, "Statut"), Some(&Value::from("0")));
        assert_eq!(t.value(2, "Statut"), Some(&Value::from("Actif")));
        assert_eq!(t.value(0, "Anciennete"), Some(&Value::Int(0)));
        assert_eq!(t.value(1, "Anciennete"), Some(&Value::Float(1.5)));
        assert!(t.rows().iter().flatten().all(|v| !v.is_null()));

        // input untouched
        assert_eq!(ds.value(0, "Anciennete"), Some(&Value::Null));
    }

    #[test]
    fn test_prepare_fails_on_missing_columns() {
        let contract = FeatureContract::new(["a", "b"], ["a"]).unwrap();
        let ds = Dataset::new(vec!["a".into()], vec![]).unwrap();
        match prepare_for_inference(&ds, &contract) {
            Err(PipelineError::Schema { missing }) => assert_eq!(missing, vec!["b".to_string()]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_score_summary_and_layout() {
        let probabilities = vec![0.9, 0.2, 0.7, 0.1, 0.6, 0.3, 0.05, 0.4, 0.45, 0.15];
        let classifier = FixedClassifier::new(probabilities);
        let result = score(&dataset(10), &classifier).unwrap();

        assert_eq!(result.summary.total_rows, 10);
        assert_eq!(result.summary.at_risk_count, 3);
        assert!((result.summary.attrition_rate - 30.0).abs() < 1e-9);
        assert_eq!(classifier.calls.get(), 2);

        let columns = result.table.columns();
        assert_eq!(columns[0], ID_CLIENT_COLUMN);
        assert_eq!(columns[columns.len() - 2], PROBABILITY_COLUMN);
        assert_eq!(columns[columns.len() - 1], PREDICTION_COLUMN);
        assert_eq!(result.table.value(0, PROBABILITY_COLUMN), Some(&Value::Float(90.0)));
        assert_eq!(result.table.value(0, PREDICTION_COLUMN), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_score_preserves_row_order_and_is_idempotent() {
        let classifier = FixedClassifier::new(vec![0.1, 0.8, 0.3, 0.9]);
        let ds = dataset(4);
        let first = score(&ds, &classifier).unwrap();
        let second = score(&ds, &classifier).unwrap();
        assert_eq!(first, second);

        let ids: Vec<String> = first
            .table
            .column_values(ID_CLIENT_COLUMN)
            .unwrap()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(ids, vec!["C0", "C1", "C2", "C3"]);
    }

    #[test]
    fn test_score_empty_dataset() {
        let classifier = FixedClassifier::new(vec![]);
        let result = score(&dataset(0), &classifier).unwrap();
        assert_eq!(result.summary.total_rows, 0);
        assert_eq!(result.summary.at_risk_count, 0);
        assert_eq!(result.summary.attrition_rate, 0.0);
        assert!(result.table.is_empty());
    }

    #[test]
    fn test_score_rejects_short_output() {
        let classifier = FixedClassifier::new(vec![0.5]);
        let result = score(&dataset(2), &classifier);
        assert!(matches!(result, Err(PipelineError::Scoring(_))));
    }

    #[test]
    fn test_score_rejects_out_of_range_probability() {
        let classifier = FixedClassifier::new(vec![0.5, 1.5]);
        let result = score(&dataset(2), &classifier);
        assert!(matches!(result, Err(PipelineError::Scoring(_))));
    }

    #[test]
    fn test_score_wraps_probability_failure() {
        let classifier =
            FixedClassifier::new(vec![0.5, 0.5]).failing_on(FailingCall::Probability);
        let err = score(&dataset(2), &classifier).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Scoring(ModelError::Inference(_))
        ));
        assert!(err.to_string().starts_with("Scoring failed"));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Inference failed: model backend unavailable");
        // labels are never requested once probabilities fail
        assert_eq!(classifier.calls.get(), 1);
    }

    #[test]
    fn test_score_wraps_label_failure() {
        let classifier = FixedClassifier::new(vec![0.5, 0.5]).failing_on(FailingCall::Label);
        let result = score(&dataset(2), &classifier);

        assert!(matches!(
            result,
            Err(PipelineError::Scoring(ModelError::Inference(_)))
        ));
        assert_eq!(classifier.calls.get(), 2);
    }

    #[test]
    fn test_prepare_keeps_float_levels_distinct_from_integers() {
        let contract = FeatureContract::new(["Statut"], ["Statut"]).unwrap();
        let ds = Dataset::new(
            vec!["Statut".into()],
            vec![
                vec![Value::Float(5.0)],
                vec![Value::Float(2.5)],
                vec![Value::Int(5)],
                vec![Value::Bool(true)],
            ],
        )
        .unwrap();

        let matrix = prepare_for_inference(&ds, &contract).unwrap();
        let levels: Vec<String> = matrix
            .as_dataset()
            .column_values("Statut")
            .unwrap()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(levels, vec!["5.0", "2.5", "5", "true"]);
    }

    #[test]
    fn test_dataset_error_is_not_reported_as_scoring() {
        let err = PipelineError::from(crate::error::DatasetError::UnknownColumn("x".into()));
        assert_eq!(err.to_string(), "Internal table error: Unknown column: x");
    }

    #[test]
    fn test_score_without_id_column() {
        let classifier = FixedClassifier::new(vec![0.5, 0.5]);
        let result = score_with_id_column(&dataset(2), &classifier, None).unwrap();
        assert_eq!(result.table.columns()[0], "Niveau_Service_Regroupe");
    }

    #[test]
    fn test_scored_rows_view() {
        let classifier = FixedClassifier::new(vec![0.25, 0.75]);
        let result = score(&dataset(2), &classifier).unwrap();
        let rows: Vec<ScoredRow<'_>> = result.scored_rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].attrition_probability, 75.0);
        assert!(rows[1].attrition_predicted);
        assert_eq!(rows[1].values.len(), 5);
        assert_eq!(rows[1].values[0], ("ID client", &Value::from("C1")));
    }
}
