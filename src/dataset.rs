use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::RawValue;

pub type RawRow = HashMap<String, RawValue>;

/// JSON exports write date cells as bare ISO days.
const ISO_DATE: &str = "%Y-%m-%d";

/// Failures that make a dataset unusable as a whole.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read dataset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON dataset must be an array of objects (entry {row} is not an object)")]
    NotTabular { row: usize },
    #[error("unsupported dataset format `{extension}` (expected .csv or .json)")]
    UnsupportedFormat { extension: String },
    #[error("dataset has no `{column}` column")]
    MissingColumn { column: String },
}

/// A fully materialized table of evaluation rows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<RawRow>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    /// Loads a CSV or JSON export in one pass.
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let dataset = match extension.as_str() {
            "csv" => {
                let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_csv_reader(file).map_err(|source| DatasetError::Csv {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            "json" => {
                let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let value: Value =
                    serde_json::from_str(&content).map_err(|source| DatasetError::Json {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::from_json_value(value)?
            }
            _ => return Err(DatasetError::UnsupportedFormat { extension }),
        };

        info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Reads every row of a CSV export. Cells that are not valid UTF-8 are
    /// decoded lossily so one bad byte degrades a single cell, not the load.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|header| String::from_utf8_lossy(header).into_owned())
            .collect();
        let mut rows = Vec::new();

        for record in reader.byte_records() {
            let record = record?;
            let row: RawRow = columns
                .iter()
                .zip(record.iter())
                .map(|(column, cell)| {
                    let value = if cell.is_empty() {
                        RawValue::Blank
                    } else {
                        let text = String::from_utf8_lossy(cell);
                        if let Cow::Owned(_) = text {
                            debug!(
                                line = record.position().map(|p| p.line()),
                                column = %column,
                                "cell is not valid UTF-8, decoded lossily"
                            );
                        }
                        RawValue::Text(text.into_owned())
                    };
                    (column.clone(), value)
                })
                .collect();
            if record.len() < columns.len() {
                debug!(
                    line = record.position().map(|p| p.line()),
                    cells = record.len(),
                    "short CSV row, trailing cells treated as missing"
                );
            }
            rows.push(row);
        }

        Ok(Self::new(columns, rows))
    }

    pub fn from_json_value(value: Value) -> Result<Self, DatasetError> {
        let entries = match value {
            Value::Array(entries) => entries,
            _ => return Err(DatasetError::NotTabular { row: 0 }),
        };

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let Value::Object(object) = entry else {
                return Err(DatasetError::NotTabular { row: index });
            };

            let mut row = RawRow::with_capacity(object.len());
            for (column, cell) in object {
                if !columns.contains(&column) {
                    columns.push(column.clone());
                }
                let value = match cell {
                    Value::Null => continue,
                    Value::String(text) if text.is_empty() => RawValue::Blank,
                    Value::String(text) => match NaiveDate::parse_from_str(&text, ISO_DATE) {
                        Ok(date) => RawValue::Date(date),
                        Err(_) => RawValue::Text(text),
                    },
                    Value::Number(number) => match number.as_f64() {
                        Some(n) => RawValue::Number(n),
                        None => RawValue::Text(number.to_string()),
                    },
                    Value::Bool(flag) => RawValue::Text(flag.to_string()),
                    other => RawValue::Text(other.to_string()),
                };
                row.insert(column, value);
            }
            rows.push(row);
        }

        Ok(Self::new(columns, rows))
    }

    /// Fails when rows exist but none of them could carry `column`.
    pub fn require_column(&self, column: &str) -> Result<(), DatasetError> {
        if self.columns.is_empty() || self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(DatasetError::MissingColumn {
                column: column.to_string(),
            })
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
