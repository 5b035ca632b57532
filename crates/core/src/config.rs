//! Backtest run configuration.

use anyhow::Result;
use chrono::NaiveDate;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::signal::{DEFAULT_MIN_EDGE, SizingParams};

/// Configuration for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// First date of the simulated window (inclusive).
    pub start: NaiveDate,
    /// Last date of the simulated window (inclusive).
    pub end: NaiveDate,
    /// Metric key (e.g. "temperature", "snowfall").
    pub metric: String,
    /// Taker fee in basis points.
    pub fee_bps: u32,
    /// Slippage allowance in basis points.
    pub slippage_bps: u32,
    /// Minimum absolute edge required to trade.
    pub min_edge: f64,
    /// Bankroll the Kelly sizing is applied to.
    pub bankroll: Decimal,
    /// Confidence scaling in percent (0-100).
    pub confidence: u8,
    /// At most this many trades per date, highest absolute edge first.
    pub max_trades_per_date: usize,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Fixed pause between locations, in milliseconds.
    pub location_delay_ms: u64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            metric: "temperature".to_string(),
            fee_bps: 100,
            slippage_bps: 50,
            min_edge: DEFAULT_MIN_EDGE,
            bankroll: Decimal::new(1000, 0),
            confidence: 70,
            max_trades_per_date: 3,
            seed: None,
            location_delay_ms: 100,
        }
    }
}

impl BacktestConfig {
    /// Sizing parameters derived from this configuration.
    #[must_use]
    pub fn sizing_params(&self) -> SizingParams {
        SizingParams {
            fee_bps: self.fee_bps,
            slippage_bps: self.slippage_bps,
            min_edge: self.min_edge,
            bankroll: self.bankroll,
            confidence: self.confidence,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads backtest configuration by merging TOML and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<BacktestConfig> {
        let config: BacktestConfig = Figment::from(figment::providers::Serialized::defaults(
            BacktestConfig::default(),
        ))
        .merge(Toml::file("config/Backtest.toml"))
        .merge(Env::prefixed("WEATHER_EDGE_"))
        .extract()?;

        Ok(config)
    }

    /// Loads backtest configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<BacktestConfig> {
        let config: BacktestConfig = Figment::from(figment::providers::Serialized::defaults(
            BacktestConfig::default(),
        ))
        .merge(Toml::file("config/Backtest.toml"))
        .merge(Toml::file(format!("config/Backtest.{profile}.toml")))
        .merge(Env::prefixed("WEATHER_EDGE_"))
        .extract()?;

        Ok(config)
    }
}
