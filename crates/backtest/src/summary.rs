//! Aggregate statistics over backtest trade results.
//!
//! A summary is stateless: every number here is re-derivable from the
//! trade list at any time. Nothing is accumulated incrementally inside
//! the engine loop.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use weather_edge_core::signal::TradeAction;
use weather_edge_core::stats::{mean, sample_std_dev};

use crate::engine::TradeResult;
use crate::scenario::MarketScenario;

/// Reported profit factor when there are no losing trades. A large
/// sentinel, not true infinity, so the value stays JSON-representable.
pub const PROFIT_FACTOR_SENTINEL: f64 = 999.0;

/// Calibration deciles with fewer samples than this are suppressed.
pub const MIN_CALIBRATION_SAMPLES: usize = 5;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const EDGE_BIN_WIDTH: f64 = 0.05;

/// One day of realized P&L.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPoint {
    /// Trade date.
    pub date: NaiveDate,
    /// Net P&L realized on this date.
    pub pnl: Decimal,
    /// Cumulative net P&L through this date.
    pub cumulative: Decimal,
}

/// One calendar month of realized P&L.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Month key, `YYYY-MM`.
    pub month: String,
    /// Net P&L realized in this month.
    pub pnl: Decimal,
}

/// One row of a keyed breakdown (location or trade side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownRow {
    /// Breakdown key.
    pub key: String,
    /// Trades under this key.
    pub trades: u32,
    /// Net P&L under this key.
    pub pnl: Decimal,
    /// Win rate under this key.
    pub win_rate: f64,
}

/// One model-probability decile of the calibration table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRow {
    /// Decile label, e.g. "0.30-0.40".
    pub label: String,
    /// Average predicted probability in the decile.
    pub predicted: f64,
    /// Realized affirmative-resolution rate in the decile.
    pub realized: f64,
    /// Trades in the decile.
    pub samples: usize,
}

/// One bin of the edge histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeBin {
    /// Inclusive lower bound.
    pub low: f64,
    /// Exclusive upper bound.
    pub high: f64,
    /// Trades whose edge fell in the bin.
    pub count: u32,
}

/// Aggregate statistics for one scenario's trade list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    /// Scenario name.
    pub scenario: String,
    /// Scenario description.
    pub description: String,

    // Basic counts
    /// Total trades executed.
    pub total_trades: u32,
    /// Winning trades (positive P&L).
    pub wins: u32,
    /// Losing trades (negative P&L).
    pub losses: u32,
    /// Win rate (wins / total).
    pub win_rate: f64,

    // Financial metrics
    /// Total amount staked.
    pub total_staked: Decimal,
    /// Total net P&L.
    pub total_pnl: Decimal,
    /// Return on total staked capital.
    pub roi: f64,

    // Risk metrics
    /// Annualized Sharpe ratio over daily P&L.
    pub sharpe: f64,
    /// Maximum drawdown of cumulative daily P&L.
    pub max_drawdown: Decimal,
    /// Gross profit over gross loss; sentinel when no losses.
    pub profit_factor: f64,
    /// Longest consecutive run of losing trades, by date order.
    pub longest_losing_streak: u32,
    /// Best single-trade P&L.
    pub best_trade: Decimal,
    /// Worst single-trade P&L.
    pub worst_trade: Decimal,

    // Series and breakdowns
    /// Daily P&L series, date-sorted.
    pub daily: Vec<DailyPoint>,
    /// Monthly P&L series.
    pub monthly: Vec<MonthlyPoint>,
    /// Per-location breakdown.
    pub by_location: Vec<BreakdownRow>,
    /// Per-side breakdown.
    pub by_action: Vec<BreakdownRow>,
    /// Calibration table by model-probability decile.
    pub calibration: Vec<CalibrationRow>,
    /// Histogram of trade edges.
    pub edge_histogram: Vec<EdgeBin>,
}

impl ScenarioSummary {
    /// Creates a summary from a scenario's trade list.
    #[must_use]
    pub fn from_trades(scenario: MarketScenario, trades: &[TradeResult]) -> Self {
        if trades.is_empty() {
            return Self::empty(scenario);
        }

        let mut sorted: Vec<&TradeResult> = trades.iter().collect();
        sorted.sort_by_key(|t| t.date);

        // Basic counts
        let total_trades = sorted.len() as u32;
        let wins = sorted.iter().filter(|t| t.win).count() as u32;
        let losses = sorted.iter().filter(|t| t.pnl < Decimal::ZERO).count() as u32;
        let win_rate = f64::from(wins) / f64::from(total_trades);

        // Financial metrics
        let total_staked: Decimal = sorted.iter().map(|t| t.stake).sum();
        let total_pnl: Decimal = sorted.iter().map(|t| t.pnl).sum();
        let roi = if total_staked > Decimal::ZERO {
            (total_pnl / total_staked).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        let daily = daily_series(&sorted);
        let monthly = monthly_series(&sorted);

        Self {
            scenario: scenario.name().to_string(),
            description: scenario.description().to_string(),
            total_trades,
            wins,
            losses,
            win_rate,
            total_staked,
            total_pnl,
            roi,
            sharpe: sharpe_ratio(&daily),
            max_drawdown: max_drawdown(&daily),
            profit_factor: profit_factor(&sorted),
            longest_losing_streak: longest_losing_streak(&sorted),
            best_trade: sorted.iter().map(|t| t.pnl).max().unwrap_or(Decimal::ZERO),
            worst_trade: sorted.iter().map(|t| t.pnl).min().unwrap_or(Decimal::ZERO),
            daily,
            monthly,
            by_location: breakdown(&sorted, |t| t.location.clone()),
            by_action: breakdown(&sorted, |t| t.action.as_str().to_string()),
            calibration: calibration_table(&sorted),
            edge_histogram: edge_histogram(&sorted),
        }
    }

    /// A summary with no trades.
    #[must_use]
    pub fn empty(scenario: MarketScenario) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            description: scenario.description().to_string(),
            total_trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            total_staked: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            roi: 0.0,
            sharpe: 0.0,
            max_drawdown: Decimal::ZERO,
            profit_factor: 0.0,
            longest_losing_streak: 0,
            best_trade: Decimal::ZERO,
            worst_trade: Decimal::ZERO,
            daily: Vec::new(),
            monthly: Vec::new(),
            by_location: Vec::new(),
            by_action: Vec::new(),
            calibration: Vec::new(),
            edge_histogram: Vec::new(),
        }
    }
}

fn daily_series(sorted: &[&TradeResult]) -> Vec<DailyPoint> {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for trade in sorted {
        *by_date.entry(trade.date).or_insert(Decimal::ZERO) += trade.pnl;
    }

    let mut cumulative = Decimal::ZERO;
    by_date
        .into_iter()
        .map(|(date, pnl)| {
            cumulative += pnl;
            DailyPoint {
                date,
                pnl,
                cumulative,
            }
        })
        .collect()
}

fn monthly_series(sorted: &[&TradeResult]) -> Vec<MonthlyPoint> {
    let mut by_month: BTreeMap<String, Decimal> = BTreeMap::new();
    for trade in sorted {
        let key = trade.date.format("%Y-%m").to_string();
        *by_month.entry(key).or_insert(Decimal::ZERO) += trade.pnl;
    }
    by_month
        .into_iter()
        .map(|(month, pnl)| MonthlyPoint { month, pnl })
        .collect()
}

/// Annualized Sharpe over the daily P&L series; sample std (n-1), zero
/// when fewer than two daily observations or a flat series.
fn sharpe_ratio(daily: &[DailyPoint]) -> f64 {
    if daily.len() < 2 {
        return 0.0;
    }
    let pnls: Vec<f64> = daily
        .iter()
        .map(|d| d.pnl.to_f64().unwrap_or(0.0))
        .collect();
    let std = sample_std_dev(&pnls);
    if std == 0.0 {
        return 0.0;
    }
    mean(&pnls) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Running peak of cumulative daily P&L minus current cumulative,
/// maximized over the date-sorted series.
fn max_drawdown(daily: &[DailyPoint]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for point in daily {
        if point.cumulative > peak {
            peak = point.cumulative;
        }
        let drawdown = peak - point.cumulative;
        if drawdown > worst {
            worst = drawdown;
        }
    }
    worst
}

fn profit_factor(sorted: &[&TradeResult]) -> f64 {
    let gross_profit: Decimal = sorted
        .iter()
        .filter(|t| t.pnl > Decimal::ZERO)
        .map(|t| t.pnl)
        .sum();
    let gross_loss: Decimal = sorted
        .iter()
        .filter(|t| t.pnl < Decimal::ZERO)
        .map(|t| -t.pnl)
        .sum();

    if gross_loss == Decimal::ZERO {
        if gross_profit > Decimal::ZERO {
            return PROFIT_FACTOR_SENTINEL;
        }
        return 0.0;
    }
    (gross_profit / gross_loss).to_f64().unwrap_or(0.0)
}

fn longest_losing_streak(sorted: &[&TradeResult]) -> u32 {
    let mut longest = 0u32;
    let mut current = 0u32;
    for trade in sorted {
        if trade.pnl < Decimal::ZERO {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn breakdown(sorted: &[&TradeResult], key_fn: impl Fn(&TradeResult) -> String) -> Vec<BreakdownRow> {
    let mut groups: BTreeMap<String, (u32, u32, Decimal)> = BTreeMap::new();
    for trade in sorted {
        let entry = groups
            .entry(key_fn(trade))
            .or_insert((0, 0, Decimal::ZERO));
        entry.0 += 1;
        if trade.win {
            entry.1 += 1;
        }
        entry.2 += trade.pnl;
    }
    groups
        .into_iter()
        .map(|(key, (trades, wins, pnl))| BreakdownRow {
            key,
            trades,
            pnl,
            win_rate: f64::from(wins) / f64::from(trades),
        })
        .collect()
}

/// Compares predicted probability to realized affirmative-resolution
/// rate per decile. Thin deciles are suppressed, not reported as noise.
fn calibration_table(sorted: &[&TradeResult]) -> Vec<CalibrationRow> {
    let mut deciles: Vec<Vec<&TradeResult>> = vec![Vec::new(); 10];
    for trade in sorted {
        let idx = ((trade.model_prob * 10.0).floor() as usize).min(9);
        deciles[idx].push(trade);
    }

    deciles
        .iter()
        .enumerate()
        .filter(|(_, group)| group.len() >= MIN_CALIBRATION_SAMPLES)
        .map(|(idx, group)| {
            let predicted =
                group.iter().map(|t| t.model_prob).sum::<f64>() / group.len() as f64;
            let resolved = group.iter().filter(|t| t.resolved).count();
            CalibrationRow {
                label: format!("{:.2}-{:.2}", idx as f64 / 10.0, (idx + 1) as f64 / 10.0),
                predicted,
                realized: resolved as f64 / group.len() as f64,
                samples: group.len(),
            }
        })
        .collect()
}

fn edge_histogram(sorted: &[&TradeResult]) -> Vec<EdgeBin> {
    let min_bin = sorted
        .iter()
        .map(|t| (t.edge / EDGE_BIN_WIDTH).floor() as i64)
        .min()
        .unwrap_or(0);
    let max_bin = sorted
        .iter()
        .map(|t| (t.edge / EDGE_BIN_WIDTH).floor() as i64)
        .max()
        .unwrap_or(0);

    (min_bin..=max_bin)
        .map(|bin| {
            let low = bin as f64 * EDGE_BIN_WIDTH;
            let high = (bin + 1) as f64 * EDGE_BIN_WIDTH;
            let count = sorted
                .iter()
                .filter(|t| (t.edge / EDGE_BIN_WIDTH).floor() as i64 == bin)
                .count() as u32;
            EdgeBin { low, high, count }
        })
        .collect()
}
