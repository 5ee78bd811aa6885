//! Question Answering Engine
//!
//! Owns the loaded datasets and answers one question at a time: classify the
//! intent, extract parameters, aggregate, and describe which rows were used.
//! Every per-question condition (no states, no crop, undefined correlation,
//! unknown intent) is answered in-band; only dataset loading can fail.

use crate::aggregate::{group_by, join_production_temperature, mean, pearson, sum_by, top_n, Correlation, JoinedRow};
use crate::config::{EngineConfig, SourceInfo};
use crate::dataset::{CropProductionRecord, DatasetStore, RainfallRecord, TemperatureRecord};
use crate::error::Result;
use crate::extract::{EntityExtractor, QueryParameters};
use crate::intent::Intent;
use crate::table::{Cell, ResultTable};
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::{debug, info};

pub const FALLBACK_MESSAGE: &str =
    "Sorry, I can currently handle rainfall comparisons, top crop lists, and simple trend correlations.";
pub const MISSING_CROP_MESSAGE: &str = "Please specify which crop to analyze.";

/// Citation for the dataset rows behind an answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub title: String,
    pub url: String,
    pub rows_used: String,
}

impl Provenance {
    fn new(source: &SourceInfo, rows_used: String) -> Self {
        Self {
            title: source.title.clone(),
            url: source.url.clone(),
            rows_used,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub intent: Intent,
    pub parameters: QueryParameters,
    pub summary: String,
    pub table: Option<ResultTable>,
    pub provenance: Vec<Provenance>,
}

impl AnswerResult {
    fn message(intent: Intent, parameters: QueryParameters, text: &str) -> Self {
        Self {
            intent,
            parameters,
            summary: text.to_string(),
            table: None,
            provenance: Vec::new(),
        }
    }
}

pub struct QaEngine {
    config: EngineConfig,
    store: DatasetStore,
    extractor: EntityExtractor,
}

impl QaEngine {
    /// Load the datasets named in `config`. Fails if any source is unusable.
    pub fn load(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = DatasetStore::load(&config)?;
        Ok(Self::new(config, store))
    }

    pub fn new(config: EngineConfig, store: DatasetStore) -> Self {
        let extractor = EntityExtractor::from_store(&store);
        Self {
            config,
            store,
            extractor,
        }
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    pub fn all_states(&self) -> &[String] {
        self.store.all_states()
    }

    pub fn answer_question(&self, question: &str) -> AnswerResult {
        let intent = Intent::classify(question);
        let params = self.extractor.extract(question, &self.config);
        info!("Question classified as {}: {}", intent, question);
        debug!("Extracted parameters: {:?}", params);

        match intent {
            Intent::Rainfall => self.answer_rainfall(params),
            Intent::TopCrops => self.answer_top_crops(params),
            Intent::Trend => self.answer_trend(params),
            Intent::Unrecognized => AnswerResult::message(intent, params, FALLBACK_MESSAGE),
        }
    }

    fn answer_rainfall(&self, params: QueryParameters) -> AnswerResult {
        let years = self.store.recent_years(params.year_window);
        let rows: Vec<&RainfallRecord> = self
            .store
            .rainfall()
            .iter()
            .filter(|r| params.states.contains(&r.state) && years.contains(&r.year))
            .collect();
        let by_state: HashMap<String, Vec<&RainfallRecord>> =
            group_by(rows.iter().copied(), |r| r.state.clone()).into_iter().collect();

        let mut lines = vec![format!("Average annual rainfall ({}):", year_span(&years))];
        let mut table = ResultTable::new(&["state", "avg_rainfall_mm"]);

        for state in &params.states {
            let avg = by_state
                .get(state)
                .and_then(|members| mean(members.iter().map(|r| r.avg_rainfall_mm)));
            match avg {
                Some(avg) => {
                    lines.push(format!("{}: {:.2} mm", state, avg));
                    table.push_row(vec![Cell::text(state.as_str()), Cell::Float(avg)]);
                }
                None => lines.push(format!("{}: no rainfall records", state)),
            }
        }
        debug!("Rainfall answer used {} rows", rows.len());

        let provenance = vec![Provenance::new(
            &self.config.sources.rainfall,
            format!("states={}, years={}", bracketed(&params.states), bracketed(&years)),
        )];

        AnswerResult {
            intent: Intent::Rainfall,
            parameters: params,
            summary: lines.join("\n"),
            table: Some(table),
            provenance,
        }
    }

    fn answer_top_crops(&self, params: QueryParameters) -> AnswerResult {
        let years = self.store.recent_years(params.year_window);
        let rows: Vec<&CropProductionRecord> = self
            .store
            .crops()
            .iter()
            .filter(|r| params.states.contains(&r.state) && years.contains(&r.year))
            .collect();

        let mut lines = vec![format!(
            "Top {} crops by production ({}):",
            params.top_m,
            year_span(&years)
        )];
        let mut table = ResultTable::new(&["state", "crop", "production_tonnes"]);

        for state in &params.states {
            let totals = sum_by(
                rows.iter().copied().filter(|r| &r.state == state),
                |r| r.crop.clone(),
                |r| r.production_tonnes,
            );
            for (crop, total) in top_n(totals, params.top_m) {
                let tonnes = total.trunc() as i64;
                lines.push(format!("{}: {} ({} t)", state, crop, tonnes));
                table.push_row(vec![
                    Cell::text(state.as_str()),
                    Cell::Text(crop),
                    Cell::Integer(tonnes),
                ]);
            }
        }
        debug!("Top-crops answer used {} rows", rows.len());

        let provenance = vec![Provenance::new(
            &self.config.sources.crop_production,
            format!("states={}, years={}", bracketed(&params.states), bracketed(&years)),
        )];

        AnswerResult {
            intent: Intent::TopCrops,
            parameters: params,
            summary: lines.join("\n"),
            table: Some(table),
            provenance,
        }
    }

    fn answer_trend(&self, params: QueryParameters) -> AnswerResult {
        let crop = match params.crop.clone() {
            Some(crop) => crop,
            None => return AnswerResult::message(Intent::Trend, params, MISSING_CROP_MESSAGE),
        };

        let years = self.store.recent_years(params.year_window);
        let crop_lower = crop.to_lowercase();
        let production: Vec<&CropProductionRecord> = self
            .store
            .crops()
            .iter()
            .filter(|r| {
                params.states.contains(&r.state)
                    && r.crop.to_lowercase() == crop_lower
                    && years.contains(&r.year)
            })
            .collect();
        let temperature: Vec<&TemperatureRecord> = self
            .store
            .temperature()
            .iter()
            .filter(|r| params.states.contains(&r.state) && years.contains(&r.year))
            .collect();

        let joined = join_production_temperature(&production, &temperature);
        let by_state: HashMap<String, Vec<&JoinedRow>> =
            group_by(&joined, |r| r.state.clone()).into_iter().collect();

        let mut lines = vec![format!(
            "Trend & correlation for {} ({}):",
            crop,
            year_span(&years)
        )];
        let mut correlations: HashMap<&str, Correlation> = HashMap::new();

        // States without joined rows get no line
        for state in &params.states {
            if let Some(points) = by_state.get(state) {
                let xs: Vec<f64> = points.iter().map(|r| r.production_tonnes).collect();
                let ys: Vec<f64> = points.iter().map(|r| r.avg_temp_c).collect();
                let corr = pearson(&xs, &ys);
                lines.push(format!(
                    "{}: correlation (temp vs production) = {}",
                    state, corr
                ));
                correlations.insert(state.as_str(), corr);
            }
        }

        let mut table = ResultTable::new(&[
            "state",
            "year",
            "crop",
            "production_tonnes",
            "avg_temp_c",
            "corr_temp_prod",
        ]);
        for row in &joined {
            let corr = correlations
                .get(row.state.as_str())
                .copied()
                .unwrap_or(Correlation::Undefined);
            table.push_row(vec![
                Cell::text(row.state.as_str()),
                Cell::Integer(i64::from(row.year)),
                Cell::text(row.crop.as_str()),
                Cell::Integer(row.production_tonnes.trunc() as i64),
                Cell::Float(row.avg_temp_c),
                corr.to_cell(),
            ]);
        }
        debug!("Trend answer joined {} rows", joined.len());

        let provenance = vec![
            Provenance::new(
                &self.config.sources.crop_production,
                format!(
                    "crop={}, states={}, years={}",
                    crop,
                    bracketed(&params.states),
                    bracketed(&years)
                ),
            ),
            Provenance::new(
                &self.config.sources.temperature,
                format!("states={}, years={}", bracketed(&params.states), bracketed(&years)),
            ),
        ];

        AnswerResult {
            intent: Intent::Trend,
            parameters: params,
            summary: lines.join("\n"),
            table: Some(table),
            provenance,
        }
    }
}

fn year_span(years: &[i32]) -> String {
    match (years.first(), years.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{}-{}", first, last),
        _ => "no years available".to_string(),
    }
}

fn bracketed<T: Display>(items: &[T]) -> String {
    format!("[{}]", items.iter().join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rain(state: &str, year: i32, mm: f64) -> RainfallRecord {
        RainfallRecord {
            state: state.to_string(),
            year,
            avg_rainfall_mm: mm,
        }
    }

    fn crop(state: &str, year: i32, name: &str, tonnes: f64) -> CropProductionRecord {
        CropProductionRecord {
            state: state.to_string(),
            year,
            crop: name.to_string(),
            production_tonnes: tonnes,
        }
    }

    fn temp(state: &str, year: i32, c: f64) -> TemperatureRecord {
        TemperatureRecord {
            state: state.to_string(),
            year,
            avg_temp_c: c,
        }
    }

    fn engine() -> QaEngine {
        let rainfall = vec![
            rain("Karnataka", 2018, 1000.0),
            rain("Karnataka", 2019, 1100.0),
            rain("Karnataka", 2020, 1200.0),
            rain("Maharashtra", 2019, 900.0),
            rain("Maharashtra", 2020, 950.0),
            rain("Punjab", 2020, 600.0),
        ];
        let crops = vec![
            crop("Karnataka", 2019, "Rice", 300.0),
            crop("Karnataka", 2020, "Rice", 330.0),
            crop("Karnataka", 2020, "Ragi", 330.0),
            crop("Karnataka", 2020, "Sugarcane", 900.5),
            crop("Maharashtra", 2020, "Cotton", 700.0),
            crop("Punjab", 2020, "Wheat", 1500.0),
        ];
        let temperature = vec![
            temp("Karnataka", 2019, 24.0),
            temp("Karnataka", 2020, 24.8),
            temp("Punjab", 2020, 23.1),
        ];
        QaEngine::new(
            EngineConfig::default(),
            DatasetStore::from_records(rainfall, crops, temperature),
        )
    }

    #[test]
    fn test_rainfall_average_over_window() {
        let answer = engine().answer_question("Rainfall in Karnataka over the last 2 years");
        assert_eq!(answer.intent, Intent::Rainfall);
        assert_eq!(
            answer.summary,
            "Average annual rainfall (2019-2020):\nKarnataka: 1150.00 mm"
        );
        let table = answer.table.unwrap();
        assert_eq!(table.rows, vec![vec![Cell::text("Karnataka"), Cell::Float(1150.0)]]);
        assert_eq!(answer.provenance.len(), 1);
        assert_eq!(
            answer.provenance[0].rows_used,
            "states=[Karnataka], years=[2019, 2020]"
        );
    }

    #[test]
    fn test_rainfall_state_without_records() {
        let answer = engine().answer_question("rain in Maharashtra and Punjab last 1 year");
        assert_eq!(
            answer.summary,
            "Average annual rainfall (2020):\nMaharashtra: 950.00 mm\nPunjab: 600.00 mm"
        );

        let answer = engine().answer_question("rain in Maharashtra for the last 3 years");
        assert!(answer.summary.ends_with("Maharashtra: 925.00 mm"));
    }

    #[test]
    fn test_rainfall_missing_state_line() {
        let store = DatasetStore::from_records(
            vec![rain("Karnataka", 2020, 1000.0)],
            vec![crop("Kerala", 2020, "Coconut", 10.0)],
            vec![],
        );
        let engine = QaEngine::new(EngineConfig::default(), store);
        let answer = engine.answer_question("rainfall in Kerala and Karnataka");
        assert_eq!(
            answer.summary,
            "Average annual rainfall (2020):\nKarnataka: 1000.00 mm\nKerala: no rainfall records"
        );
        assert_eq!(answer.table.unwrap().len(), 1);
    }

    #[test]
    fn test_top_crops_ranking_and_truncation() {
        let answer = engine().answer_question("top 2 crops in Karnataka");
        assert_eq!(answer.intent, Intent::TopCrops);
        assert_eq!(
            answer.summary,
            "Top 2 crops by production (2018-2020):\nKarnataka: Sugarcane (900 t)\nKarnataka: Rice (630 t)"
        );
        let table = answer.table.unwrap();
        assert_eq!(table.columns, vec!["state", "crop", "production_tonnes"]);
        assert_eq!(table.rows[0][2], Cell::Integer(900));
        assert_eq!(answer.provenance[0].title, "Ministry of Agriculture – Crop Production (sample)");
    }

    #[test]
    fn test_top_crops_defaults_to_configured_states() {
        let answer = engine().answer_question("top crops");
        assert_eq!(answer.parameters.states, vec!["Karnataka", "Maharashtra"]);
        let table = answer.table.unwrap();
        assert_eq!(table.rows_for_state("Karnataka").count(), 3);
        assert_eq!(table.rows_for_state("Maharashtra").count(), 1);
        assert_eq!(table.rows_for_state("Punjab").count(), 0);
    }

    #[test]
    fn test_trend_requires_crop() {
        let answer = engine().answer_question("show the trend in Karnataka");
        assert_eq!(answer.intent, Intent::Trend);
        assert_eq!(answer.summary, MISSING_CROP_MESSAGE);
        assert!(answer.table.is_none());
        assert!(answer.provenance.is_empty());
    }

    #[test]
    fn test_trend_correlation_and_undefined() {
        let answer = engine().answer_question("correlate rice production with temperature in Karnataka");
        assert_eq!(answer.intent, Intent::Trend);
        assert_eq!(answer.parameters.crop.as_deref(), Some("Rice"));
        assert_eq!(
            answer.summary,
            "Trend & correlation for Rice (2018-2020):\nKarnataka: correlation (temp vs production) = 1.00"
        );
        let table = answer.table.unwrap();
        assert_eq!(table.len(), 2);
        let r = table.rows[0][5].as_f64().unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        assert_eq!(answer.provenance.len(), 2);

        let answer = engine().answer_question("wheat trend in Punjab");
        assert_eq!(
            answer.summary,
            "Trend & correlation for Wheat (2018-2020):\nPunjab: correlation (temp vs production) = undefined"
        );
        assert!(answer.table.unwrap().rows[0][5].is_undefined());
    }

    #[test]
    fn test_trend_without_joined_rows() {
        let answer = engine().answer_question("cotton trend in Maharashtra");
        assert_eq!(answer.summary, "Trend & correlation for Cotton (2018-2020):");
        assert!(answer.table.unwrap().is_empty());
        assert_eq!(answer.provenance.len(), 2);
    }

    #[test]
    fn test_unrecognized() {
        let answer = engine().answer_question("What's the weather like");
        assert_eq!(answer.intent, Intent::Unrecognized);
        assert_eq!(answer.summary, FALLBACK_MESSAGE);
        assert!(answer.table.is_none());
        assert!(answer.provenance.is_empty());
    }

    #[test]
    fn test_year_span() {
        assert_eq!(year_span(&[2019, 2020, 2021]), "2019-2021");
        assert_eq!(year_span(&[2021]), "2021");
        assert_eq!(year_span(&[]), "no years available");
    }
}
