//! In-memory providers backed by fixed series.
//!
//! These power the backtest engine and tests. They ignore the location
//! argument (one provider instance per location) and serve whatever
//! series they were constructed with, filtered to the requested window.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::provider::{
    DataError, EventProvider, ForecastProvider, HistoricalProvider, IndexProvider,
};
use crate::types::{DailyObservation, EnsembleResult, Location, MonthlyAnomaly, PointEvent};

/// Forecast provider serving one canned ensemble per model key.
#[derive(Debug, Default, Clone)]
pub struct MemoryForecastProvider {
    ensembles: HashMap<String, Vec<f64>>,
}

impl MemoryForecastProvider {
    /// Creates an empty provider; every fetch fails with `MissingSeries`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the members a model will serve.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, members: Vec<f64>) -> Self {
        self.ensembles.insert(model.into(), members);
        self
    }
}

#[async_trait]
impl ForecastProvider for MemoryForecastProvider {
    async fn fetch_ensemble(
        &self,
        _location: &Location,
        _date: NaiveDate,
        _metric: &str,
        model: &str,
    ) -> Result<EnsembleResult, DataError> {
        let members = self
            .ensembles
            .get(model)
            .ok_or(DataError::MissingSeries)?
            .clone();
        Ok(EnsembleResult {
            model: model.to_string(),
            members,
        })
    }
}

/// Historical provider serving a fixed daily series.
#[derive(Debug, Default, Clone)]
pub struct MemoryHistoricalProvider {
    series: Vec<DailyObservation>,
}

impl MemoryHistoricalProvider {
    /// Creates a provider over a fixed series.
    #[must_use]
    pub fn new(series: Vec<DailyObservation>) -> Self {
        Self { series }
    }
}

#[async_trait]
impl HistoricalProvider for MemoryHistoricalProvider {
    async fn fetch_daily_series(
        &self,
        _location: &Location,
        _metric: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyObservation>, DataError> {
        let window: Vec<DailyObservation> = self
            .series
            .iter()
            .filter(|obs| obs.date >= start && obs.date <= end)
            .copied()
            .collect();
        if window.is_empty() {
            return Err(DataError::MissingSeries);
        }
        Ok(window)
    }
}

/// Event provider serving a fixed catalog.
#[derive(Debug, Default, Clone)]
pub struct MemoryEventProvider {
    events: Vec<PointEvent>,
}

impl MemoryEventProvider {
    /// Creates a provider over a fixed catalog.
    #[must_use]
    pub fn new(events: Vec<PointEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventProvider for MemoryEventProvider {
    // The fixture catalog is assumed pre-filtered to the search radius.
    async fn fetch_events(
        &self,
        _location: &Location,
        _radius_km: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PointEvent>, DataError> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.time >= start && e.time <= end)
            .copied()
            .collect())
    }
}

/// Index provider serving a fixed anomaly history.
#[derive(Debug, Default, Clone)]
pub struct MemoryIndexProvider {
    anomalies: Vec<MonthlyAnomaly>,
}

impl MemoryIndexProvider {
    /// Creates a provider over a fixed anomaly history.
    #[must_use]
    pub fn new(anomalies: Vec<MonthlyAnomaly>) -> Self {
        Self { anomalies }
    }
}

#[async_trait]
impl IndexProvider for MemoryIndexProvider {
    // The fixture holds one calendar month's series.
    async fn fetch_monthly_anomalies(
        &self,
        _month: u32,
    ) -> Result<Vec<MonthlyAnomaly>, DataError> {
        if self.anomalies.is_empty() {
            return Err(DataError::MissingSeries);
        }
        Ok(self.anomalies.clone())
    }
}
