//! Provider traits for the four upstream data shapes.
//!
//! Consumers are written against these traits; the backtest wires in
//! in-memory fixtures while production wiring points the same traits at
//! real HTTP clients. Metric identifiers cross this boundary as string
//! keys so the provider layer stays free of domain types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::types::{DailyObservation, EnsembleResult, Location, MonthlyAnomaly, PointEvent};

/// Errors from upstream data sources.
#[derive(Error, Debug)]
pub enum DataError {
    /// Transport-level failure (connection, status, timeout).
    #[error("http error: {0}")]
    Http(String),
    /// The upstream responded but the payload was not usable.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// The upstream rejected the request for rate reasons.
    #[error("rate limited by upstream")]
    RateLimited,
    /// The requested series does not exist for this location or window.
    #[error("requested series is missing")]
    MissingSeries,
}

/// Fetches ensemble forecast members from one weather model.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetches the members one model produced for a location and target date.
    ///
    /// # Errors
    /// Returns [`DataError`] when the upstream fails or the payload is
    /// unusable; callers pooling several models treat this as a per-model
    /// failure, not a fatal one.
    async fn fetch_ensemble(
        &self,
        location: &Location,
        date: NaiveDate,
        metric: &str,
        model: &str,
    ) -> Result<EnsembleResult, DataError>;
}

/// Fetches daily historical observations.
#[async_trait]
pub trait HistoricalProvider: Send + Sync {
    /// Fetches the daily series for a location over a closed date window.
    ///
    /// # Errors
    /// Returns [`DataError`] on upstream failure. A historical series is
    /// load-bearing for climatology, so callers treat this as fatal.
    async fn fetch_daily_series(
        &self,
        location: &Location,
        metric: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyObservation>, DataError>;
}

/// Fetches discrete point events (earthquake catalogs).
#[async_trait]
pub trait EventProvider: Send + Sync {
    /// Fetches events within `radius_km` of a location over a time window.
    ///
    /// # Errors
    /// Returns [`DataError`] on upstream failure.
    async fn fetch_events(
        &self,
        location: &Location,
        radius_km: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PointEvent>, DataError>;
}

/// Fetches a monthly climate-anomaly index.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Fetches one calendar month's anomaly across all years, oldest first.
    ///
    /// # Errors
    /// Returns [`DataError`] on upstream failure; callers fall back to a
    /// bundled table rather than aborting.
    async fn fetch_monthly_anomalies(
        &self,
        month: u32,
    ) -> Result<Vec<MonthlyAnomaly>, DataError>;
}
