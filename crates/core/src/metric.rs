//! Metric configuration registry.
//!
//! Every supported market metric is described by one static [`MetricProfile`]
//! so the distribution builders, bucket model, and backtest engine are
//! parameterized by data instead of branching on metric names. Unknown metric
//! keys fail fast at this boundary with [`MetricError::Unsupported`]; nothing
//! downstream ever sees an unvalidated key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from metric lookup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetricError {
    /// The metric key does not name a supported metric.
    #[error("unsupported metric: {0}")]
    Unsupported(String),
}

/// A market metric the system can estimate and trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherMetric {
    Temperature,
    Snowfall,
    Rainfall,
    WindSpeed,
    EarthquakeMagnitude,
    ClimateAnomaly,
}

impl WeatherMetric {
    /// Canonical string key for this metric.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Snowfall => "snowfall",
            Self::Rainfall => "rainfall",
            Self::WindSpeed => "wind_speed",
            Self::EarthquakeMagnitude => "earthquake_magnitude",
            Self::ClimateAnomaly => "climate_anomaly",
        }
    }
}

impl fmt::Display for WeatherMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherMetric {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(Self::Temperature),
            "snowfall" => Ok(Self::Snowfall),
            "rainfall" => Ok(Self::Rainfall),
            "wind_speed" => Ok(Self::WindSpeed),
            "earthquake_magnitude" => Ok(Self::EarthquakeMagnitude),
            "climate_anomaly" => Ok(Self::ClimateAnomaly),
            other => Err(MetricError::Unsupported(other.to_string())),
        }
    }
}

/// How raw sub-daily observations collapse into one daily value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Daily maximum (temperature, wind gusts).
    Max,
    /// Daily total (precipitation, snowfall).
    Sum,
    /// Daily mean (index anomalies).
    Mean,
}

/// Which distribution builder produces forecasts for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Multi-model forecast ensemble pooling.
    ForecastEnsemble,
    /// Poisson synthesis from historical event frequency.
    HistoricalFrequency,
    /// Trend-adjusted regression over a monthly index series.
    TrendIndex,
}

/// Static per-metric configuration.
#[derive(Debug, Clone, Serialize)]
pub struct MetricProfile {
    /// The metric this profile describes.
    pub metric: WeatherMetric,
    /// Unit every threshold and observation is expressed in.
    pub primary_unit: &'static str,
    /// Display-only secondary unit, where one exists.
    pub secondary_unit: Option<&'static str>,
    /// Default forecast uncertainty (sigma) in primary units, used by the
    /// Normal fallback path when no ensemble is available.
    pub default_sigma: f64,
    /// Daily aggregation mode for raw observations.
    pub aggregation: Aggregation,
    /// Distribution builder for this metric.
    pub data_source: DataSource,
    /// Whether a geographic location is required (false for global indices).
    pub requires_location: bool,
    /// Width of climatological closed-range buckets, in primary units.
    pub bucket_width: f64,
}

static PROFILES: [MetricProfile; 6] = [
    MetricProfile {
        metric: WeatherMetric::Temperature,
        primary_unit: "°C",
        secondary_unit: Some("°F"),
        default_sigma: 2.5,
        aggregation: Aggregation::Max,
        data_source: DataSource::ForecastEnsemble,
        requires_location: true,
        bucket_width: 2.0,
    },
    MetricProfile {
        metric: WeatherMetric::Snowfall,
        primary_unit: "cm",
        secondary_unit: Some("in"),
        default_sigma: 3.0,
        aggregation: Aggregation::Sum,
        data_source: DataSource::ForecastEnsemble,
        requires_location: true,
        bucket_width: 2.0,
    },
    MetricProfile {
        metric: WeatherMetric::Rainfall,
        primary_unit: "mm",
        secondary_unit: Some("in"),
        default_sigma: 5.0,
        aggregation: Aggregation::Sum,
        data_source: DataSource::ForecastEnsemble,
        requires_location: true,
        bucket_width: 5.0,
    },
    MetricProfile {
        metric: WeatherMetric::WindSpeed,
        primary_unit: "km/h",
        secondary_unit: Some("mph"),
        default_sigma: 8.0,
        aggregation: Aggregation::Max,
        data_source: DataSource::ForecastEnsemble,
        requires_location: true,
        bucket_width: 10.0,
    },
    MetricProfile {
        metric: WeatherMetric::EarthquakeMagnitude,
        primary_unit: "M",
        secondary_unit: None,
        default_sigma: 0.5,
        aggregation: Aggregation::Max,
        data_source: DataSource::HistoricalFrequency,
        requires_location: true,
        bucket_width: 0.5,
    },
    MetricProfile {
        metric: WeatherMetric::ClimateAnomaly,
        primary_unit: "°C",
        secondary_unit: None,
        default_sigma: 0.15,
        aggregation: Aggregation::Mean,
        data_source: DataSource::TrendIndex,
        requires_location: false,
        bucket_width: 0.1,
    },
];

impl MetricProfile {
    /// Returns the static profile for a metric.
    #[must_use]
    pub fn get(metric: WeatherMetric) -> &'static MetricProfile {
        match metric {
            WeatherMetric::Temperature => &PROFILES[0],
            WeatherMetric::Snowfall => &PROFILES[1],
            WeatherMetric::Rainfall => &PROFILES[2],
            WeatherMetric::WindSpeed => &PROFILES[3],
            WeatherMetric::EarthquakeMagnitude => &PROFILES[4],
            WeatherMetric::ClimateAnomaly => &PROFILES[5],
        }
    }

    /// Validated lookup by string key.
    ///
    /// This is the single entry point for untrusted metric keys; an unknown
    /// key is an error here, never a silent default deeper in the call graph.
    ///
    /// # Errors
    /// Returns [`MetricError::Unsupported`] for an unknown key.
    pub fn lookup(key: &str) -> Result<&'static MetricProfile, MetricError> {
        let metric = WeatherMetric::from_str(key)?;
        Ok(Self::get(metric))
    }

    /// Converts a value in the primary unit to the secondary display unit,
    /// where one exists.
    #[must_use]
    pub fn to_secondary(&self, value: f64) -> Option<f64> {
        match self.metric {
            WeatherMetric::Temperature => Some(units::celsius_to_fahrenheit(value)),
            WeatherMetric::Snowfall => Some(units::cm_to_inches(value)),
            WeatherMetric::Rainfall => Some(units::mm_to_inches(value)),
            WeatherMetric::WindSpeed => Some(units::kmh_to_mph(value)),
            WeatherMetric::EarthquakeMagnitude | WeatherMetric::ClimateAnomaly => None,
        }
    }
}

/// Unit conversions between primary and secondary display units.
pub mod units {
    /// Celsius to Fahrenheit.
    #[must_use]
    pub fn celsius_to_fahrenheit(c: f64) -> f64 {
        c * 9.0 / 5.0 + 32.0
    }

    /// Fahrenheit to Celsius.
    #[must_use]
    pub fn fahrenheit_to_celsius(f: f64) -> f64 {
        (f - 32.0) * 5.0 / 9.0
    }

    /// Millimeters to inches.
    #[must_use]
    pub fn mm_to_inches(mm: f64) -> f64 {
        mm / 25.4
    }

    /// Inches to millimeters.
    #[must_use]
    pub fn inches_to_mm(inches: f64) -> f64 {
        inches * 25.4
    }

    /// Centimeters to inches.
    #[must_use]
    pub fn cm_to_inches(cm: f64) -> f64 {
        cm / 2.54
    }

    /// Inches to centimeters.
    #[must_use]
    pub fn inches_to_cm(inches: f64) -> f64 {
        inches * 2.54
    }

    /// Kilometers per hour to miles per hour.
    #[must_use]
    pub fn kmh_to_mph(kmh: f64) -> f64 {
        kmh / 1.609_344
    }

    /// Miles per hour to kilometers per hour.
    #[must_use]
    pub fn mph_to_kmh(mph: f64) -> f64 {
        mph * 1.609_344
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // Lookup Tests
    // ============================================================

    #[test]
    fn lookup_known_metric_returns_profile() {
        let profile = MetricProfile::lookup("temperature").unwrap();
        assert_eq!(profile.metric, WeatherMetric::Temperature);
        assert_eq!(profile.primary_unit, "°C");
        assert_eq!(profile.data_source, DataSource::ForecastEnsemble);
    }

    #[test]
    fn lookup_unknown_metric_fails_fast() {
        let err = MetricProfile::lookup("humidity").unwrap_err();
        assert_eq!(err, MetricError::Unsupported("humidity".to_string()));
    }

    #[test]
    fn lookup_never_defaults_to_temperature() {
        // An empty key must be rejected, not degraded to a default profile.
        assert!(MetricProfile::lookup("").is_err());
        assert!(MetricProfile::lookup("Temperature").is_err());
    }

    #[test]
    fn every_metric_has_a_profile() {
        for metric in [
            WeatherMetric::Temperature,
            WeatherMetric::Snowfall,
            WeatherMetric::Rainfall,
            WeatherMetric::WindSpeed,
            WeatherMetric::EarthquakeMagnitude,
            WeatherMetric::ClimateAnomaly,
        ] {
            let profile = MetricProfile::get(metric);
            assert_eq!(profile.metric, metric);
            assert!(profile.default_sigma > 0.0);
            assert!(profile.bucket_width > 0.0);
        }
    }

    #[test]
    fn climate_anomaly_needs_no_location() {
        let profile = MetricProfile::get(WeatherMetric::ClimateAnomaly);
        assert!(!profile.requires_location);
        assert_eq!(profile.data_source, DataSource::TrendIndex);
    }

    #[test]
    fn earthquake_uses_historical_frequency() {
        let profile = MetricProfile::get(WeatherMetric::EarthquakeMagnitude);
        assert_eq!(profile.data_source, DataSource::HistoricalFrequency);
        assert!(profile.secondary_unit.is_none());
    }

    #[test]
    fn metric_round_trips_through_str() {
        for key in [
            "temperature",
            "snowfall",
            "rainfall",
            "wind_speed",
            "earthquake_magnitude",
            "climate_anomaly",
        ] {
            let metric: WeatherMetric = key.parse().unwrap();
            assert_eq!(metric.as_str(), key);
        }
    }

    #[test]
    fn metric_serde_uses_snake_case() {
        let json = serde_json::to_string(&WeatherMetric::WindSpeed).unwrap();
        assert_eq!(json, "\"wind_speed\"");
        let back: WeatherMetric = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WeatherMetric::WindSpeed);
    }

    // ============================================================
    // Unit Conversion Tests
    // ============================================================

    #[test]
    fn celsius_fahrenheit_known_points() {
        assert!((units::celsius_to_fahrenheit(0.0) - 32.0).abs() < 1e-9);
        assert!((units::celsius_to_fahrenheit(100.0) - 212.0).abs() < 1e-9);
        assert!((units::fahrenheit_to_celsius(-40.0) - -40.0).abs() < 1e-9);
    }

    #[test]
    fn conversions_round_trip() {
        for x in [-12.5, 0.0, 3.75, 98.6] {
            assert!(
                (units::fahrenheit_to_celsius(units::celsius_to_fahrenheit(x)) - x).abs() < 1e-9
            );
            assert!((units::inches_to_mm(units::mm_to_inches(x)) - x).abs() < 1e-9);
            assert!((units::inches_to_cm(units::cm_to_inches(x)) - x).abs() < 1e-9);
            assert!((units::mph_to_kmh(units::kmh_to_mph(x)) - x).abs() < 1e-9);
        }
    }

    #[test]
    fn to_secondary_only_for_metrics_with_one() {
        let temp = MetricProfile::get(WeatherMetric::Temperature);
        assert!((temp.to_secondary(20.0).unwrap() - 68.0).abs() < 1e-9);

        let quake = MetricProfile::get(WeatherMetric::EarthquakeMagnitude);
        assert!(quake.to_secondary(5.0).is_none());
    }
}
