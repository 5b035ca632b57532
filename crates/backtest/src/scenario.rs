//! Market-pricing scenarios.
//!
//! A backtest needs a counterparty. Two pricing models bracket the
//! realistic range: a market that only knows climatology, and a market
//! running its own forecast that is noisier than ours.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use weather_edge_core::bucket::Bucket;
use weather_edge_core::probability::normal_probability;
use weather_edge_core::stats::sample_normal;

/// Floor applied to every scenario price.
pub const PRICE_FLOOR: f64 = 0.02;

/// Ceiling applied to every scenario price.
pub const PRICE_CEIL: f64 = 0.98;

/// How the simulated market prices its buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketScenario {
    /// Prices derived from historical base rates.
    Climatology,
    /// Prices derived from a less accurate simulated forecast.
    NoisyForecast,
}

impl MarketScenario {
    /// Both scenarios, in report order.
    #[must_use]
    pub fn all() -> [Self; 2] {
        [Self::Climatology, Self::NoisyForecast]
    }

    /// Canonical scenario name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Climatology => "climatological-market",
            Self::NoisyForecast => "noisy-forecast-market",
        }
    }

    /// One-line description for reports.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Climatology => "Market prices buckets from historical base rates only",
            Self::NoisyForecast => "Market runs its own forecast with wider error than ours",
        }
    }
}

/// Prices buckets from historical hit counts.
///
/// Laplace-smoothed per bucket as `(count + 0.5) / (n + 0.5 * k)`, then
/// normalized to sum 1 and clamped to `[PRICE_FLOOR, PRICE_CEIL]`.
#[must_use]
pub fn climatology_prices(buckets: &[Bucket], sample: &[f64]) -> Vec<f64> {
    let n = sample.len() as f64;
    let k = buckets.len() as f64;

    let raw: Vec<f64> = buckets
        .iter()
        .map(|bucket| {
            let count = sample.iter().filter(|v| bucket.resolves(**v)).count() as f64;
            (count + 0.5) / (n + 0.5 * k)
        })
        .collect();

    normalize_and_clamp(raw)
}

/// Prices buckets from one noisy simulated forecast.
///
/// Draws a single biased mean around the actual outcome, then prices
/// each bucket with the Normal CDF at the market's (wider) sigma.
#[must_use]
pub fn noisy_forecast_prices(
    buckets: &[Bucket],
    actual: f64,
    bias_std: f64,
    market_sigma: f64,
    rng: &mut ChaCha8Rng,
) -> Vec<f64> {
    let noisy_mean = sample_normal(rng, actual, bias_std);
    let raw: Vec<f64> = buckets
        .iter()
        .map(|bucket| normal_probability(bucket, noisy_mean, market_sigma))
        .collect();

    normalize_and_clamp(raw)
}

fn normalize_and_clamp(raw: Vec<f64>) -> Vec<f64> {
    let total: f64 = raw.iter().sum();
    raw.into_iter()
        .map(|p| {
            let normalized = if total > 0.0 { p / total } else { p };
            normalized.clamp(PRICE_FLOOR, PRICE_CEIL)
        })
        .collect()
}
