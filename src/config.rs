//! Configuration file handling.
//!
//! Settings live in an optional `.training-report.toml`; every value has a
//! default matching the evaluation spreadsheet the tool was built for.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::Criterion;

pub const DEFAULT_CONFIG_FILE: &str = ".training-report.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset used when neither `--data` nor `TRAINING_DATA` is given.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// How raw spreadsheet rows map onto training sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// chrono formats tried, in order, on text dates.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    #[serde(default)]
    pub columns: ColumnConfig,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
            columns: ColumnConfig::default(),
        }
    }
}

fn default_date_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Column labels of the evaluation spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub id: String,
    pub advisor: String,
    pub evaluator: String,
    pub date: String,
    pub duration: String,
    pub presentation: String,
    pub probing: String,
    pub argumentation: String,
    pub rebuttal: String,
    pub closing: String,
    pub presentation_notes: String,
    pub probing_notes: String,
    pub argumentation_notes: String,
    pub rebuttal_notes: String,
    pub closing_notes: String,
    pub compliance: String,
    pub unmet_commandments: String,
    pub comments: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            id: "ID".to_string(),
            advisor: "Asesor Evaluado".to_string(),
            evaluator: "Evaluador".to_string(),
            date: "Fecha de Capa".to_string(),
            duration: "Duración de Capa".to_string(),
            presentation: "Nivel de Expertise en Presentación".to_string(),
            probing: "Nivel de Expertise en Sondeo".to_string(),
            argumentation: "Nivel de Expertise en Argumentación".to_string(),
            rebuttal: "Nivel de Expertise en Rebate".to_string(),
            closing: "Nivel de Expertise en Cierre".to_string(),
            presentation_notes: "Presentación".to_string(),
            probing_notes: "Sondeo".to_string(),
            argumentation_notes: "Argumentación".to_string(),
            rebuttal_notes: "Rebate".to_string(),
            closing_notes: "Cierre".to_string(),
            compliance: "¿Cumple los 6 Mandamientos de la Venta Carrión?".to_string(),
            unmet_commandments: "¿Cuál o cuáles mandamientos NO cumple?".to_string(),
            comments: "Detalles o Comentarios Adicionales".to_string(),
        }
    }
}

impl ColumnConfig {
    pub fn criterion(&self, criterion: Criterion) -> &str {
        match criterion {
            Criterion::Presentation => &self.presentation,
            Criterion::Probing => &self.probing,
            Criterion::Argumentation => &self.argumentation,
            Criterion::Rebuttal => &self.rebuttal,
            Criterion::Closing => &self.closing,
        }
    }

    /// Column holding the evaluator's written observation for `criterion`.
    pub fn criterion_notes(&self, criterion: Criterion) -> &str {
        match criterion {
            Criterion::Presentation => &self.presentation_notes,
            Criterion::Probing => &self.probing_notes,
            Criterion::Argumentation => &self.argumentation_notes,
            Criterion::Rebuttal => &self.rebuttal_notes,
            Criterion::Closing => &self.closing_notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Text shown for any blank or missing detail field.
    pub fallback: String,
    pub unknown_date: String,
    pub date_format: String,
    pub format: OutputFormat,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fallback: "not available".to_string(),
            unknown_date: "unknown date".to_string(),
            date_format: "%d-%m-%Y".to_string(),
            format: OutputFormat::Markdown,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `.training-report.toml` from the working directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_source_spreadsheet() {
        let config = Config::default();
        assert_eq!(config.schema.columns.advisor, "Asesor Evaluado");
        assert_eq!(
            config.schema.columns.criterion(Criterion::Rebuttal),
            "Nivel de Expertise en Rebate"
        );
        assert_eq!(
            config.schema.columns.criterion_notes(Criterion::Probing),
            "Sondeo"
        );
        assert_eq!(config.display.fallback, "not available");
        assert_eq!(config.display.format, OutputFormat::Markdown);
        assert!(config.data.path.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let toml_content = r#"
[data]
path = "exports/sessions.csv"

[schema]
date_formats = ["%m/%d/%Y"]

[schema.columns]
advisor = "Advisor"
duration = "Minutes"

[display]
fallback = "No disponible"
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.data.path, Some(PathBuf::from("exports/sessions.csv")));
        assert_eq!(config.schema.date_formats, vec!["%m/%d/%Y"]);
        assert_eq!(config.schema.columns.advisor, "Advisor");
        assert_eq!(config.schema.columns.duration, "Minutes");
        assert_eq!(config.schema.columns.evaluator, "Evaluador");
        assert_eq!(config.display.fallback, "No disponible");
        assert_eq!(config.display.unknown_date, "unknown date");
        assert_eq!(config.display.format, OutputFormat::Json);
    }

    #[test]
    fn default_toml_round_trips() {
        let toml_str = Config::default_toml().unwrap();
        assert!(toml_str.contains("[schema.columns]"));
        assert!(toml_str.contains("[display]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.schema.columns, ColumnConfig::default());
    }
}
