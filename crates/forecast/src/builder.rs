//! Builder selection by metric data source.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use weather_edge_core::metric::{DataSource, MetricProfile};
use weather_edge_core::probability::ForecastDistribution;
use weather_edge_data::{
    EventProvider, FetchThrottle, ForecastProvider, IndexProvider, Location,
};

use crate::climate::{fallback_anomalies, synthesize_anomaly};
use crate::earthquake::{synthesize_max_magnitude, DEFAULT_SYNTHETIC_MEMBERS};
use crate::ensemble::{pool_models, PooledEnsemble, DEFAULT_MODELS};

/// Years of catalog history behind the earthquake rate estimate.
pub const EVENT_LOOKBACK_YEARS: i64 = 10;

/// Search radius for catalog queries, in kilometers.
pub const EVENT_RADIUS_KM: f64 = 250.0;

/// The upstream handles a builder may pull from.
#[derive(Clone)]
pub struct Providers {
    /// Ensemble forecast source.
    pub forecast: Arc<dyn ForecastProvider>,
    /// Event catalog source.
    pub events: Arc<dyn EventProvider>,
    /// Climate index source.
    pub index: Arc<dyn IndexProvider>,
    /// Shared fetch throttle.
    pub throttle: FetchThrottle,
}

/// Output of a builder dispatch.
#[derive(Debug, Clone)]
pub enum BuiltDistribution {
    /// A pooled multi-model ensemble (weather metrics).
    Ensemble(PooledEnsemble),
    /// A synthesized distribution (earthquake or climate metrics).
    Synthetic(ForecastDistribution),
}

impl BuiltDistribution {
    /// The distribution the probability engine consumes.
    #[must_use]
    pub fn combined(&self) -> &ForecastDistribution {
        match self {
            Self::Ensemble(pooled) => &pooled.combined,
            Self::Synthetic(dist) => dist,
        }
    }

    /// Per-model distributions, when the builder produced any.
    #[must_use]
    pub fn per_model(&self) -> &[ForecastDistribution] {
        match self {
            Self::Ensemble(pooled) => &pooled.per_model,
            Self::Synthetic(_) => &[],
        }
    }
}

/// Builds the forecast distribution for one metric, location, and date.
///
/// Dispatches on the profile's data source. `Ok(None)` means no usable
/// distribution exists today (every ensemble model failed); callers fall
/// back to the Normal path or skip the event.
///
/// # Errors
/// Returns an error when a load-bearing fetch fails. The climate index is
/// the exception: its fetch failure degrades to the bundled history table.
pub async fn build_distribution(
    providers: &Providers,
    profile: &MetricProfile,
    location: &Location,
    date: NaiveDate,
    horizon_days: f64,
    rng: &mut ChaCha8Rng,
) -> anyhow::Result<Option<BuiltDistribution>> {
    match profile.data_source {
        DataSource::ForecastEnsemble => {
            let pooled = pool_models(
                providers.forecast.as_ref(),
                &providers.throttle,
                location,
                date,
                profile.metric.as_str(),
                &DEFAULT_MODELS,
            )
            .await?;
            Ok(pooled.map(BuiltDistribution::Ensemble))
        }
        DataSource::HistoricalFrequency => {
            providers.throttle.acquire().await;
            let end = Utc::now();
            let start = end - Duration::days(EVENT_LOOKBACK_YEARS * 365);
            let catalog = providers
                .events
                .fetch_events(location, EVENT_RADIUS_KM, start, end)
                .await
                .with_context(|| format!("event catalog fetch for {}", location.name))?;
            let dist = synthesize_max_magnitude(
                &catalog,
                EVENT_LOOKBACK_YEARS as f64,
                horizon_days,
                DEFAULT_SYNTHETIC_MEMBERS,
                rng,
            );
            Ok(Some(BuiltDistribution::Synthetic(dist)))
        }
        DataSource::TrendIndex => {
            providers.throttle.acquire().await;
            let history = match providers.index.fetch_monthly_anomalies(date.month()).await {
                Ok(history) => history,
                Err(err) => {
                    warn!(%err, "index fetch failed, using bundled anomaly table");
                    fallback_anomalies()
                }
            };
            let dist = synthesize_anomaly(
                &history,
                date.year(),
                DEFAULT_SYNTHETIC_MEMBERS,
                rng,
            );
            Ok(Some(BuiltDistribution::Synthetic(dist)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_edge_core::metric::WeatherMetric;
    use weather_edge_core::stats::seeded_rng;
    use weather_edge_data::{
        DataError, MemoryEventProvider, MemoryForecastProvider, MemoryIndexProvider, PointEvent,
    };

    struct FailingIndex;

    #[async_trait::async_trait]
    impl IndexProvider for FailingIndex {
        async fn fetch_monthly_anomalies(
            &self,
            _month: u32,
        ) -> Result<Vec<weather_edge_data::MonthlyAnomaly>, DataError> {
            Err(DataError::Http("503".to_string()))
        }
    }

    fn providers(forecast: MemoryForecastProvider, events: Vec<PointEvent>) -> Providers {
        Providers {
            forecast: Arc::new(forecast),
            events: Arc::new(MemoryEventProvider::new(events)),
            index: Arc::new(MemoryIndexProvider::new(fallback_anomalies())),
            throttle: FetchThrottle::new(),
        }
    }

    fn loc() -> Location {
        Location::new("Test Station", 40.78, -73.97)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn weather_metric_dispatches_to_the_ensemble_path() {
        let forecast = MemoryForecastProvider::new()
            .with_model("gfs_seamless", vec![20.0, 21.0, 22.0, 23.0]);
        let providers = providers(forecast, vec![]);
        let profile = MetricProfile::get(WeatherMetric::Temperature);
        let mut rng = seeded_rng(Some(1));

        let built = build_distribution(&providers, profile, &loc(), date(), 1.0, &mut rng)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(built, BuiltDistribution::Ensemble(_)));
        assert_eq!(built.per_model().len(), 1);
    }

    #[tokio::test]
    async fn earthquake_metric_synthesizes_from_the_catalog() {
        let t0 = Utc::now();
        let catalog: Vec<PointEvent> = (0..100)
            .map(|i| PointEvent {
                time: t0 - Duration::days(i * 30),
                magnitude: 4.0,
            })
            .collect();
        let providers = providers(MemoryForecastProvider::new(), catalog);
        let profile = MetricProfile::get(WeatherMetric::EarthquakeMagnitude);
        let mut rng = seeded_rng(Some(2));

        let built = build_distribution(&providers, profile, &loc(), date(), 30.0, &mut rng)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(built, BuiltDistribution::Synthetic(_)));
        assert_eq!(built.combined().member_count, DEFAULT_SYNTHETIC_MEMBERS);
    }

    #[tokio::test]
    async fn climate_index_failure_degrades_to_the_bundled_table() {
        let providers = Providers {
            forecast: Arc::new(MemoryForecastProvider::new()),
            events: Arc::new(MemoryEventProvider::new(vec![])),
            index: Arc::new(FailingIndex),
            throttle: FetchThrottle::new(),
        };
        let profile = MetricProfile::get(WeatherMetric::ClimateAnomaly);
        let mut rng = seeded_rng(Some(3));

        let built = build_distribution(&providers, profile, &loc(), date(), 1.0, &mut rng)
            .await
            .unwrap()
            .unwrap();

        // Bundled history trends ~0.9-1.3 in the mid-2020s.
        let mean = built.combined().mean();
        assert!((0.5..1.8).contains(&mean), "mean was {mean}");
    }

    #[tokio::test]
    async fn all_models_failing_yields_none() {
        let providers = providers(MemoryForecastProvider::new(), vec![]);
        let profile = MetricProfile::get(WeatherMetric::Snowfall);
        let mut rng = seeded_rng(Some(4));

        let built = build_distribution(&providers, profile, &loc(), date(), 1.0, &mut rng)
            .await
            .unwrap();
        assert!(built.is_none());
    }
}
