//! Edge computation and risk-adjusted Kelly sizing.
//!
//! One parameterized implementation serves both the single-signal API and
//! the backtest loop; there is deliberately no second copy of this math
//! anywhere in the workspace.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bucket::Bucket;
use crate::probability::{bucket_probability, ForecastDistribution};

/// Hard cap on the Kelly fraction. A deliberate safety choice: whatever the
/// computed optimum, at most a quarter of bankroll is ever suggested.
pub const MAX_KELLY_FRACTION: f64 = 0.25;

/// Default minimum absolute edge below which no trade is recommended.
pub const DEFAULT_MIN_EDGE: f64 = 0.03;

/// Recommended action for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Buy the affirmative side (model probability above market + costs).
    BuyYes,
    /// Buy the negative side (model probability below market - costs).
    BuyNo,
    /// Edge within the minimum threshold; stand aside.
    NoTrade,
}

impl TradeAction {
    /// Canonical string key, used in summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyYes => "buy_yes",
            Self::BuyNo => "buy_no",
            Self::NoTrade => "no_trade",
        }
    }
}

/// Fee, threshold, and sizing parameters for signal computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingParams {
    /// Taker fee in basis points of stake.
    pub fee_bps: u32,
    /// Slippage allowance in basis points of stake.
    pub slippage_bps: u32,
    /// Minimum absolute edge required to trade (strict inequality).
    pub min_edge: f64,
    /// Bankroll the Kelly fraction is applied to.
    pub bankroll: Decimal,
    /// User confidence scaling in percent (0-100), applied to the
    /// half-Kelly size.
    pub confidence: u8,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            fee_bps: 100,
            slippage_bps: 50,
            min_edge: DEFAULT_MIN_EDGE,
            bankroll: Decimal::new(1000, 0),
            confidence: 70,
        }
    }
}

impl SizingParams {
    /// Combined fee and slippage cost as a probability-space fraction.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        f64::from(self.fee_bps + self.slippage_bps) / 10_000.0
    }
}

/// The decision object for one bucket at one point in time.
///
/// Immutable once computed; changed inputs mean a new signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Label of the bucket this signal prices (empty for ad-hoc signals).
    pub bucket_label: String,
    /// Model-estimated probability of the bucket resolving true.
    pub model_prob: f64,
    /// Market-implied probability (the quoted price).
    pub market_price: f64,
    /// Fee plus slippage in probability space.
    pub total_cost: f64,
    /// Signed edge: `model_prob - market_price - total_cost`.
    pub edge: f64,
    /// Recommended action.
    pub action: TradeAction,
    /// Capped Kelly fraction in `[0, 0.25]`.
    pub kelly_fraction: f64,
    /// Confidence-scaled half-Kelly dollar size, rounded to cents;
    /// exactly zero when `action` is `NoTrade`.
    pub suggested_size: Decimal,
    /// Whether all per-model probabilities sat on the same side of 0.5.
    /// Informational only - never gates the trade decision.
    pub models_agree: Option<bool>,
}

impl TradeSignal {
    /// Attaches a bucket label.
    #[must_use]
    pub fn with_bucket_label(mut self, label: impl Into<String>) -> Self {
        self.bucket_label = label.into();
        self
    }

    /// Attaches the informational model-agreement flag.
    #[must_use]
    pub fn with_models_agreement(mut self, agree: Option<bool>) -> Self {
        self.models_agree = agree;
        self
    }
}

/// Computes the trade signal for one bucket price.
///
/// # Arguments
/// * `model_prob` - Model probability of the affirmative outcome
/// * `market_price` - Quoted affirmative price in (0, 1)
/// * `params` - Fees, threshold, bankroll, and confidence
#[must_use]
pub fn compute_signal(model_prob: f64, market_price: f64, params: &SizingParams) -> TradeSignal {
    let total_cost = params.total_cost();
    let edge = model_prob - market_price - total_cost;

    // Strict inequality: an edge exactly at the threshold is a no-trade.
    let action = if edge > params.min_edge {
        TradeAction::BuyYes
    } else if edge < -params.min_edge {
        TradeAction::BuyNo
    } else {
        TradeAction::NoTrade
    };

    let kelly_fraction = match action {
        TradeAction::BuyYes => kelly_for_side(model_prob, market_price + total_cost),
        TradeAction::BuyNo => kelly_for_side(1.0 - model_prob, (1.0 - market_price) + total_cost),
        TradeAction::NoTrade => 0.0,
    };

    let suggested_size = if action == TradeAction::NoTrade {
        // Forced to zero regardless of any rounding artifact upstream.
        Decimal::ZERO
    } else {
        suggested_dollars(kelly_fraction, params)
    };

    TradeSignal {
        bucket_label: String::new(),
        model_prob,
        market_price,
        total_cost,
        edge,
        action,
        kelly_fraction,
        suggested_size,
        models_agree: None,
    }
}

/// Binary-market Kelly fraction for one side, capped to
/// [`MAX_KELLY_FRACTION`].
///
/// `win_prob` is the probability the chosen side pays out and
/// `effective_price` its cost-adjusted entry price. An effective price at
/// or above 1.0 is a boundary case of the math, not an error: the answer
/// is simply "bet nothing".
#[must_use]
pub fn kelly_for_side(win_prob: f64, effective_price: f64) -> f64 {
    if effective_price >= 1.0 {
        return 0.0;
    }
    let kelly = (win_prob - effective_price) / (1.0 - effective_price);
    kelly.clamp(0.0, MAX_KELLY_FRACTION)
}

/// Half-Kelly dollar size scaled by user confidence, rounded to cents.
fn suggested_dollars(kelly_fraction: f64, params: &SizingParams) -> Decimal {
    let kelly = Decimal::from_f64_retain(kelly_fraction).unwrap_or(Decimal::ZERO);
    let confidence = Decimal::from(params.confidence.min(100)) / Decimal::ONE_HUNDRED;
    (params.bankroll * kelly * Decimal::new(5, 1) * confidence).round_dp(2)
}

/// Informational agreement flag across per-model probabilities.
///
/// `Some(true)` when every model probability sits on the same side of 0.5;
/// `None` when fewer than two models contributed.
#[must_use]
pub fn models_agree(per_model_probs: &[f64]) -> Option<bool> {
    if per_model_probs.len() < 2 {
        return None;
    }
    let above = per_model_probs.iter().filter(|p| **p > 0.5).count();
    Some(above == 0 || above == per_model_probs.len())
}

/// Computes signals for a whole bucket set against one prefetched
/// distribution.
///
/// The distribution is fetched once and shared read-only across every
/// bucket; a bad price for one bucket skips that bucket (with a warning)
/// without aborting its siblings.
///
/// # Errors
/// Returns an error when `buckets` and `market_prices` differ in length -
/// that is a caller bug, not a per-bucket data problem.
pub fn compute_signals(
    buckets: &[Bucket],
    market_prices: &[f64],
    dist: &ForecastDistribution,
    fallback_sigma: f64,
    params: &SizingParams,
) -> anyhow::Result<Vec<TradeSignal>> {
    if buckets.len() != market_prices.len() {
        anyhow::bail!(
            "bucket/price mismatch: {} buckets, {} prices",
            buckets.len(),
            market_prices.len()
        );
    }

    let mut signals = Vec::with_capacity(buckets.len());
    for (bucket, price) in buckets.iter().zip(market_prices.iter()) {
        if !price.is_finite() || *price <= 0.0 || *price >= 1.0 {
            warn!(bucket = %bucket.label, price, "skipping bucket with unusable market price");
            continue;
        }
        let model_prob = bucket_probability(bucket, dist, fallback_sigma);
        signals
            .push(compute_signal(model_prob, *price, params).with_bucket_label(&bucket.label));
    }
    Ok(signals)
}
