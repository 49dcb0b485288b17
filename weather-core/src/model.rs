use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized weather observation for one location.
///
/// Samples are created by a provider and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub location: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(
        location: impl Into<String>,
        temperature_c: f64,
        feels_like_c: f64,
        condition: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            location: location.into(),
            temperature_c,
            feels_like_c,
            condition: condition.into(),
            timestamp,
        }
    }
}

/// Aggregate of one location's samples over a single day. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub location: String,
    pub avg_temp_c: f64,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub dominant_condition: String,
}
