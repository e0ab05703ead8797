//! Dataset loading and result export using Polars

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::{Dataset, Value};
use crate::error::SourceError;
use crate::pipeline::{ScoringResult, ScoringSummary};

/// Header prefix of index columns left behind by spreadsheet exports
const UNNAMED_PREFIX: &str = "Unnamed";

/// Load a customer table from a CSV file with a header row
///
/// Column types are inferred by Polars. `Unnamed*` index columns are dropped.
///
/// # Arguments
/// * `path` - Path to the CSV file
///
/// # Returns
/// * `Dataset` with one typed `Value` per cell
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset, SourceError> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let dataset = dataframe_to_dataset(&df)?;
    info!(
        path = %path.display(),
        rows = dataset.n_rows(),
        columns = dataset.n_columns(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Convert a Polars frame into a [`Dataset`], dropping `Unnamed*` columns
pub fn dataframe_to_dataset(df: &DataFrame) -> Result<Dataset, SourceError> {
    let mut columns = Vec::with_capacity(df.width());

    for series in df.get_columns() {
        let name = series.name().to_string();
        if name.starts_with(UNNAMED_PREFIX) {
            debug!(column = %name, "Dropping unnamed index column");
            continue;
        }
        columns.push((name, series_values(series)?));
    }

    Ok(Dataset::from_columns(columns)?)
}

fn series_values(series: &Series) -> Result<Vec<Value>, SourceError> {
    let dtype = series.dtype().clone();

    let values = if dtype.is_integer() {
        series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(Value::from)
            .collect()
    } else if dtype.is_float() {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(Value::from)
            .collect()
    } else if dtype == DataType::Boolean {
        series.bool()?.into_iter().map(Value::from).collect()
    } else {
        series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(Value::from)
            .collect()
    };

    Ok(values)
}

/// Column storage picked for export, from the values present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Str,
}

fn column_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let this = match value {
            Value::Null => continue,
            Value::Int(_) => ColumnKind::Int,
            Value::Float(_) => ColumnKind::Float,
            Value::Bool(_) => ColumnKind::Bool,
            Value::Str(_) => return ColumnKind::Str,
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int), ColumnKind::Float) | (Some(ColumnKind::Float), ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Str,
        });
    }
    kind.unwrap_or(ColumnKind::Str)
}

/// Convert a [`Dataset`] into a Polars frame, one typed series per column
pub fn dataset_to_dataframe(dataset: &Dataset) -> Result<DataFrame, SourceError> {
    let mut series = Vec::with_capacity(dataset.n_columns());

    for (idx, name) in dataset.columns().iter().enumerate() {
        let cells = move || dataset.rows().iter().map(move |row| &row[idx]);
        let s = match column_kind(cells()) {
            ColumnKind::Int => {
                let v: Vec<Option<i64>> = cells()
                    .map(|c| match c {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                Series::new(name.as_str().into(), v)
            }
            ColumnKind::Float => {
                let v: Vec<Option<f64>> = cells().map(Value::as_f64).collect();
                Series::new(name.as_str().into(), v)
            }
            ColumnKind::Bool => {
                let v: Vec<Option<bool>> = cells()
                    .map(|c| match c {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect();
                Series::new(name.as_str().into(), v)
            }
            ColumnKind::Str => {
                let v: Vec<Option<String>> = cells()
                    .map(|c| (!c.is_null()).then(|| c.to_string()))
                    .collect();
                Series::new(name.as_str().into(), v)
            }
        };
        series.push(s);
    }

    Ok(DataFrame::new(series)?)
}

/// Write the scored table as CSV
///
/// # Arguments
/// * `result` - Scoring result whose table is exported
/// * `path` - Destination CSV file, overwritten if present
pub fn export_results<P: AsRef<Path>>(result: &ScoringResult, path: P) -> Result<(), SourceError> {
    let path = path.as_ref();
    let mut df = dataset_to_dataframe(&result.table)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!(path = %path.display(), rows = df.height(), "Exported scored dataset");
    Ok(())
}

/// JSON summary written next to an export
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport<'a> {
    pub model: &'a str,
    pub scored_at: DateTime<Utc>,
    #[serde(flatten)]
    pub summary: ScoringSummary,
}

/// Write the scoring aggregates as pretty-printed JSON
pub fn write_summary_report<P: AsRef<Path>>(
    result: &ScoringResult,
    model_name: &str,
    path: P,
) -> Result<(), SourceError> {
    let report = SummaryReport {
        model: model_name,
        scored_at: Utc::now(),
        summary: result.summary,
    };
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Unnamed: 0,ID client,Statut,Anciennete,Montant").unwrap();
        writeln!(file, "0,C1,Actif,3,12.5").unwrap();
        writeln!(file, "1,C2,,7,").unwrap();
        writeln!(file, "2,C3,Resilie,,4.0").unwrap();
        file
    }

    #[test]
    fn test_load_dataset_drops_unnamed_and_maps_types() {
        let file = create_test_csv();
        let ds = load_dataset(file.path()).unwrap();

        assert_eq!(ds.shape(), (3, 4));
        assert_eq!(ds.columns()[0], "ID client");
        assert_eq!(ds.value(0, "Statut"), Some(&Value::from("Actif")));
        assert_eq!(ds.value(1, "Statut"), Some(&Value::Null));
        assert_eq!(ds.value(0, "Anciennete"), Some(&Value::Int(3)));
        assert_eq!(ds.value(2, "Anciennete"), Some(&Value::Null));
        assert_eq!(ds.value(0, "Montant"), Some(&Value::Float(12.5)));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_dataset("/nonexistent/customers.csv").is_err());
    }

    #[test]
    fn test_dataset_to_dataframe_types() {
        let ds = Dataset::new(
            vec!["i".into(), "mixed_num".into(), "b".into(), "s".into()],
            vec![
                vec![Value::Int(1), Value::Int(1), Value::Bool(true), Value::Int(1)],
                vec![Value::Null, Value::Float(2.5), Value::Bool(false), Value::from("x")],
            ],
        )
        .unwrap();

        let df = dataset_to_dataframe(&ds).unwrap();
        assert_eq!(df.shape(), (2, 4));
        assert_eq!(df.column("i").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("mixed_num").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("s").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_column_kind() {
        let vals = [Value::Null, Value::Int(1), Value::Float(1.0)];
        assert_eq!(column_kind(vals.iter()), ColumnKind::Float);
        let vals = [Value::Bool(true), Value::Int(1)];
        assert_eq!(column_kind(vals.iter()), ColumnKind::Str);
        let vals = [Value::Null];
        assert_eq!(column_kind(vals.iter()), ColumnKind::Str);
    }
}
