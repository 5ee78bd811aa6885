//! Entity Extraction
//!
//! Pulls query parameters (states, year window, top-M count, crop) out of free
//! text by case-insensitive substring and pattern matching against the known
//! vocabularies. Matching is not tokenized: a state name embedded in a longer
//! word still matches.

use crate::config::EngineConfig;
use crate::dataset::DatasetStore;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref LAST_N_YEARS: Regex = Regex::new(r"last\s+(\d+)\s+years?").unwrap();
    static ref LAST_YEAR: Regex = Regex::new(r"last\s+year").unwrap();
    static ref TOP_M: Regex = Regex::new(r"top\s+(\d+)").unwrap();
}

/// Parameters derived from a single question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameters {
    pub states: Vec<String>,
    pub year_window: usize,
    pub top_m: usize,
    pub crop: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EntityExtractor {
    /// Iteration order decides first-match order
    states: Vec<String>,
    /// Longest names first so "Arhar/Tur" wins over "Tur"
    crops: Vec<String>,
}

impl EntityExtractor {
    pub fn new(states: Vec<String>, crops: Vec<String>) -> Self {
        let mut crops = crops;
        crops.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        crops.dedup();
        Self { states, crops }
    }

    pub fn from_store(store: &DatasetStore) -> Self {
        Self::new(store.all_states().to_vec(), store.crop_names())
    }

    pub fn crop_vocabulary(&self) -> &[String] {
        &self.crops
    }

    /// Known states mentioned in the question, de-duplicated, in vocabulary order
    pub fn extract_states(&self, question: &str) -> Vec<String> {
        let q = question.to_lowercase();
        let mut found: Vec<String> = Vec::new();
        for state in &self.states {
            if q.contains(&state.to_lowercase()) && !found.contains(state) {
                found.push(state.clone());
            }
        }
        found
    }

    /// "last N years" gives N, "last year" gives 1, otherwise `default`
    pub fn extract_year_window(&self, question: &str, default: usize) -> usize {
        let q = question.to_lowercase();
        if let Some(n) = LAST_N_YEARS
            .captures(&q)
            .and_then(|caps| caps[1].parse::<usize>().ok())
        {
            return n;
        }
        if LAST_YEAR.is_match(&q) {
            return 1;
        }
        default
    }

    pub fn extract_top_m(&self, question: &str, default: usize) -> usize {
        let q = question.to_lowercase();
        TOP_M
            .captures(&q)
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .unwrap_or(default)
    }

    /// Longest known crop contained in the question, in the dataset's casing
    pub fn extract_crop(&self, question: &str) -> Option<String> {
        let q = question.to_lowercase();
        self.crops
            .iter()
            .find(|crop| q.contains(&crop.to_lowercase()))
            .cloned()
    }

    /// Run every extractor and fill gaps from the configured defaults
    pub fn extract(&self, question: &str, config: &EngineConfig) -> QueryParameters {
        let mut states = self.extract_states(question);
        if states.is_empty() {
            states = config.default_states.clone();
        }

        QueryParameters {
            states,
            year_window: self.extract_year_window(question, config.default_year_window),
            top_m: self.extract_top_m(question, config.default_top_m),
            crop: self.extract_crop(question),
        }
    }
}
