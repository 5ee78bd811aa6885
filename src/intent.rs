//! Intent routing
//!
//! Keyword checks in fixed precedence: rainfall, top crops, trend, otherwise
//! unrecognized. The first match wins.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Average rainfall per state over the year window
    Rainfall,
    /// Highest-producing crops per state
    TopCrops,
    /// Crop production vs temperature correlation
    Trend,
    Unrecognized,
}

impl Intent {
    pub fn classify(question: &str) -> Self {
        let q = question.to_lowercase();

        if contains_any(&q, &["rainfall", "rain"]) {
            Intent::Rainfall
        } else if q.contains("top") && q.contains("crop") {
            Intent::TopCrops
        } else if contains_any(&q, &["trend", "correlate"]) {
            Intent::Trend
        } else {
            Intent::Unrecognized
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Rainfall => "rainfall",
            Intent::TopCrops => "top_crops",
            Intent::Trend => "trend",
            Intent::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}
