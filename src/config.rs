//! Scoring configuration loaded from a TOML file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::pipeline::ID_CLIENT_COLUMN;

/// Default export file name
pub const DEFAULT_EXPORT_PATH: &str = "Attrition_Scoring_Result.csv";
/// Rows shown in the console preview
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// A named model artifact
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelEntry {
    /// Human-readable label shown by `models`
    #[serde(default)]
    pub label: Option<String>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub path: PathBuf,
    pub preview_rows: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_EXPORT_PATH),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_model: Option<String>,
    /// Identifier column moved to the front of scored output
    pub id_column: String,
    pub models: BTreeMap<String, ModelEntry>,
    pub export: ExportSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: None,
            id_column: ID_CLIENT_COLUMN.to_string(),
            models: BTreeMap::new(),
            export: ExportSettings::default(),
        }
    }
}

impl Config {
    /// Load a configuration file
    ///
    /// Relative model paths are resolved against the directory holding the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&raw)?;
        if let Some(base) = path.parent() {
            config.rebase_model_paths(base);
        }
        Ok(config)
    }

    fn rebase_model_paths(&mut self, base: &Path) {
        for entry in self.models.values_mut() {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        if let Some(name) = &config.default_model {
            if !config.models.contains_key(name) {
                return Err(ConfigError::UnknownDefaultModel(name.clone()));
            }
        }
        Ok(config)
    }

    /// Resolve a model selector to an artifact path
    ///
    /// A selector naming a configured model uses that entry; anything else is
    /// taken as a path. Without a selector the default model is used.
    pub fn resolve_model(&self, selector: Option<&str>) -> Option<PathBuf> {
        match selector {
            Some(name) => Some(
                self.models
                    .get(name)
                    .map(|entry| entry.path.clone())
                    .unwrap_or_else(|| PathBuf::from(name)),
            ),
            None => self
                .default_model
                .as_ref()
                .and_then(|name| self.models.get(name))
                .map(|entry| entry.path.clone()),
        }
    }
}
