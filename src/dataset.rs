//! Dataset Store
//!
//! Loads the rainfall, crop production and temperature CSV files once at startup
//! into typed, read-only record vectors. Any missing file, missing column or
//! unparseable cell aborts the load.

use crate::config::EngineConfig;
use crate::error::{QaError, Result};
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallRecord {
    pub state: String,
    pub year: i32,
    pub avg_rainfall_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProductionRecord {
    pub state: String,
    pub year: i32,
    pub crop: String,
    pub production_tonnes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub state: String,
    pub year: i32,
    pub avg_temp_c: f64,
}

pub const RAINFALL_COLUMNS: [&str; 3] = ["state", "year", "avg_rainfall_mm"];
pub const CROP_PRODUCTION_COLUMNS: [&str; 4] = ["state", "year", "crop", "production_tonnes"];
pub const TEMPERATURE_COLUMNS: [&str; 3] = ["state", "year", "avg_temp_c"];

/// Immutable in-memory copy of the three datasets
#[derive(Debug, Clone)]
pub struct DatasetStore {
    rainfall: Vec<RainfallRecord>,
    crops: Vec<CropProductionRecord>,
    temperature: Vec<TemperatureRecord>,
    /// Sorted union of the state columns
    states: Vec<String>,
}

impl DatasetStore {
    /// Load all three sources from the paths named in `config`
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let rainfall = load_rainfall(&config.rainfall_path())?;
        let crops = load_crop_production(&config.crop_production_path())?;
        let temperature = load_temperature(&config.temperature_path())?;

        let store = Self::from_records(rainfall, crops, temperature);
        info!(
            "Loaded datasets: {} rainfall rows, {} crop rows, {} temperature rows, {} states",
            store.rainfall.len(),
            store.crops.len(),
            store.temperature.len(),
            store.states.len()
        );
        Ok(store)
    }

    pub fn from_records(
        rainfall: Vec<RainfallRecord>,
        crops: Vec<CropProductionRecord>,
        temperature: Vec<TemperatureRecord>,
    ) -> Self {
        let states: BTreeSet<String> = rainfall
            .iter()
            .map(|r| r.state.clone())
            .chain(crops.iter().map(|r| r.state.clone()))
            .chain(temperature.iter().map(|r| r.state.clone()))
            .collect();

        Self {
            rainfall,
            crops,
            temperature,
            states: states.into_iter().collect(),
        }
    }

    pub fn rainfall(&self) -> &[RainfallRecord] {
        &self.rainfall
    }

    pub fn crops(&self) -> &[CropProductionRecord] {
        &self.crops
    }

    pub fn temperature(&self) -> &[TemperatureRecord] {
        &self.temperature
    }

    /// Every state named in any dataset, alphabetically
    pub fn all_states(&self) -> &[String] {
        &self.states
    }

    /// Distinct crop names in first-seen order
    pub fn crop_names(&self) -> Vec<String> {
        self.crops.iter().map(|r| r.crop.clone()).unique().collect()
    }

    /// The `n` most recent years present in the rainfall dataset, ascending.
    /// Relative to the data, not to the calendar.
    pub fn recent_years(&self, n: usize) -> Vec<i32> {
        let years: BTreeSet<i32> = self.rainfall.iter().map(|r| r.year).collect();
        let skip = years.len().saturating_sub(n);
        years.into_iter().skip(skip).collect()
    }
}

fn load_rainfall(path: &Path) -> Result<Vec<RainfallRecord>> {
    let source = "rainfall";
    let df = read_frame(path, source, &RAINFALL_COLUMNS)?;
    let states = text_column(&df, source, "state")?;
    let years = year_column(&df, source, "year")?;
    let rainfall = float_column(&df, source, "avg_rainfall_mm")?;

    Ok(states
        .into_iter()
        .zip(years)
        .zip(rainfall)
        .map(|((state, year), avg_rainfall_mm)| RainfallRecord {
            state,
            year,
            avg_rainfall_mm,
        })
        .collect())
}

fn load_crop_production(path: &Path) -> Result<Vec<CropProductionRecord>> {
    let source = "crop production";
    let df = read_frame(path, source, &CROP_PRODUCTION_COLUMNS)?;
    let states = text_column(&df, source, "state")?;
    let years = year_column(&df, source, "year")?;
    let crops = text_column(&df, source, "crop")?;
    let production = float_column(&df, source, "production_tonnes")?;

    Ok(states
        .into_iter()
        .zip(years)
        .zip(crops)
        .zip(production)
        .map(|(((state, year), crop), production_tonnes)| CropProductionRecord {
            state,
            year,
            crop,
            production_tonnes,
        })
        .collect())
}

fn load_temperature(path: &Path) -> Result<Vec<TemperatureRecord>> {
    let source = "temperature";
    let df = read_frame(path, source, &TEMPERATURE_COLUMNS)?;
    let states = text_column(&df, source, "state")?;
    let years = year_column(&df, source, "year")?;
    let temps = float_column(&df, source, "avg_temp_c")?;

    Ok(states
        .into_iter()
        .zip(years)
        .zip(temps)
        .map(|((state, year), avg_temp_c)| TemperatureRecord {
            state,
            year,
            avg_temp_c,
        })
        .collect())
}

fn read_frame(path: &Path, source_name: &str, required: &[&str]) -> Result<DataFrame> {
    if !path.exists() {
        return Err(QaError::MissingSource(path.display().to_string()));
    }

    info!("Loading {} dataset: {}", source_name, path.display());
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .map_err(|e| QaError::Polars(format!("Failed to load CSV {}: {}", path.display(), e)))?
        .collect()?;

    for column in required {
        if df.column(column).is_err() {
            return Err(QaError::MissingColumn {
                source_name: source_name.to_string(),
                column: column.to_string(),
            });
        }
    }

    Ok(df)
}

fn malformed(source_name: &str, column: &str, row: usize) -> QaError {
    QaError::MalformedValue {
        source_name: source_name.to_string(),
        column: column.to_string(),
        row: row + 1,
    }
}

fn text_column(df: &DataFrame, source_name: &str, column: &str) -> Result<Vec<String>> {
    let series = df.column(column)?.cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value.map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(malformed(source_name, column, row)),
        })
        .collect()
}

fn year_column(df: &DataFrame, source_name: &str, column: &str) -> Result<Vec<i32>> {
    // Non-strict cast: unparseable cells become null
    let series = df.column(column)?.cast(&DataType::Int32)?;
    series
        .i32()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| malformed(source_name, column, row)))
        .collect()
}

fn float_column(df: &DataFrame, source_name: &str, column: &str) -> Result<Vec<f64>> {
    let series = df.column(column)?.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(malformed(source_name, column, row)),
        })
        .collect()
}
