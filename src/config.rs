//! Engine Configuration
//!
//! Where the datasets live, how each source is cited, and the defaults applied
//! when a question leaves a parameter unspecified.

use crate::error::{QaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "SAMARTH_DATA_DIR";

/// Citation details for one dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceInfo {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceCatalog {
    pub rainfall: SourceInfo,
    pub crop_production: SourceInfo,
    pub temperature: SourceInfo,
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self {
            rainfall: SourceInfo {
                title: "IMD – Rainfall in India (sample)".to_string(),
                url: "https://data.gov.in/dataset/rainfall-india".to_string(),
            },
            crop_production: SourceInfo {
                title: "Ministry of Agriculture – Crop Production (sample)".to_string(),
                url: "https://data.gov.in/dataset/crop-production".to_string(),
            },
            temperature: SourceInfo {
                title: "IMD Temperature (sample)".to_string(),
                url: "https://data.gov.in/dataset/imd-temperature".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub rainfall_file: String,
    pub crop_production_file: String,
    pub temperature_file: String,
    /// States used when a question names none
    pub default_states: Vec<String>,
    pub default_year_window: usize,
    pub default_top_m: usize,
    pub sources: SourceCatalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            rainfall_file: "state_rainfall.csv".to_string(),
            crop_production_file: "crop_production.csv".to_string(),
            temperature_file: "climate_temp.csv".to_string(),
            default_states: vec!["Karnataka".to_string(), "Maharashtra".to_string()],
            default_year_window: 3,
            default_top_m: 3,
            sources: SourceCatalog::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QaError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, with the data directory taken from `SAMARTH_DATA_DIR` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_states.is_empty() {
            return Err(QaError::Config("default_states must not be empty".to_string()));
        }
        for (key, file) in [
            ("rainfall_file", &self.rainfall_file),
            ("crop_production_file", &self.crop_production_file),
            ("temperature_file", &self.temperature_file),
        ] {
            if file.trim().is_empty() {
                return Err(QaError::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }

    pub fn rainfall_path(&self) -> PathBuf {
        self.data_dir.join(&self.rainfall_file)
    }

    pub fn crop_production_path(&self) -> PathBuf {
        self.data_dir.join(&self.crop_production_file)
    }

    pub fn temperature_path(&self) -> PathBuf {
        self.data_dir.join(&self.temperature_file)
    }
}
