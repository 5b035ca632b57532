//! Series and result types shared by every provider.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A geographic point a market event is anchored to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Display name (e.g. "NYC Central Park").
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// Forecast members fetched from one model for one location and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// Model identifier (e.g. "gfs_seamless").
    pub model: String,
    /// Member values in the metric's primary unit.
    pub members: Vec<f64>,
}

impl EnsembleResult {
    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// One daily historical observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    /// Observation date.
    pub date: NaiveDate,
    /// Observed value in the metric's primary unit.
    pub value: f64,
}

/// One discrete event in a point process (e.g. an earthquake).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointEvent {
    /// Event timestamp.
    pub time: DateTime<Utc>,
    /// Event magnitude.
    pub magnitude: f64,
}

/// One monthly climate-index reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAnomaly {
    /// Calendar year.
    pub year: i32,
    /// Anomaly relative to the index baseline, in degrees Celsius.
    pub anomaly: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensemble_result_counts_members() {
        let result = EnsembleResult {
            model: "gfs_seamless".to_string(),
            members: vec![1.0, 2.0, 3.0],
        };
        assert_eq!(result.member_count(), 3);
    }

    #[test]
    fn observation_serde_round_trip() {
        let obs = DailyObservation {
            date: NaiveDate::from_ymd_opt(2024, 7, 4).unwrap(),
            value: 31.5,
        };
        let json = serde_json::to_string(&obs).unwrap();
        let back: DailyObservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obs);
    }
}
