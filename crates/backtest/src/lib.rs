pub mod engine;
pub mod scenario;
pub mod summary;

pub use engine::{BacktestEngine, BacktestReport, TradeResult, MIN_CLIMATOLOGY_DAYS};
pub use scenario::{climatology_prices, noisy_forecast_prices, MarketScenario};
pub use summary::{ScenarioSummary, MIN_CALIBRATION_SAMPLES, PROFIT_FACTOR_SENTINEL};

use weather_edge_core::config::BacktestConfig;
use weather_edge_data::{HistoricalProvider, Location};

/// Runs a configured backtest end to end.
///
/// # Errors
/// Returns an error for an unknown metric key or a failed historical
/// fetch.
pub async fn run_backtest(
    config: BacktestConfig,
    locations: &[Location],
    historical: &dyn HistoricalProvider,
) -> anyhow::Result<BacktestReport> {
    BacktestEngine::new(config)?.run(locations, historical).await
}
