//! Contract outcome buckets.
//!
//! A bucket set partitions a metric's value space into one low open tail,
//! one high open tail, and fixed-width closed ranges between them. Buckets
//! are built either from climatology (backtests) or directly from a live
//! market's sub-market thresholds (production); resolution against an
//! observed value is the same pure function in both cases.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::percentile;

/// Minimum number of buckets for an event to be tradeable. Below this the
/// climatological spread is too narrow to price distinct outcomes.
pub const MIN_BUCKET_COUNT: usize = 3;

/// Quantiles anchoring the climatological tails.
const LOW_QUANTILE: f64 = 0.05;
const HIGH_QUANTILE: f64 = 0.95;

/// Errors from bucket construction.
#[derive(Error, Debug, PartialEq)]
pub enum BucketError {
    /// A closed range was requested with `low > high`.
    #[error("invalid bucket range: low {low} > high {high}")]
    InvalidRange {
        /// Requested lower bound.
        low: f64,
        /// Requested upper bound.
        high: f64,
    },
    /// The climatology sample was empty.
    #[error("empty climatology sample")]
    EmptySample,
    /// The requested bucket width was zero or negative.
    #[error("bucket width must be positive, got {0}")]
    InvalidWidth(f64),
}

/// The resolution rule for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BucketRule {
    /// Open high tail: resolves when `value >= threshold`.
    AtOrAbove {
        /// Inclusive lower bound.
        threshold: f64,
    },
    /// Open low tail: resolves when `value <= threshold`.
    AtOrBelow {
        /// Inclusive upper bound.
        threshold: f64,
    },
    /// Closed range, inclusive on both ends.
    Between {
        /// Inclusive lower bound.
        low: f64,
        /// Inclusive upper bound.
        high: f64,
    },
}

/// One outcome bucket of a market event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Human-readable label (e.g. "2.0 to 4.0 cm").
    pub label: String,
    /// Resolution rule.
    pub rule: BucketRule,
}

impl Bucket {
    /// Creates an open high-tail bucket (`value >= threshold`).
    #[must_use]
    pub fn at_or_above(threshold: f64, unit: &str) -> Self {
        Self {
            label: format!("{threshold:.1} {unit} or above"),
            rule: BucketRule::AtOrAbove { threshold },
        }
    }

    /// Creates an open low-tail bucket (`value <= threshold`).
    #[must_use]
    pub fn at_or_below(threshold: f64, unit: &str) -> Self {
        Self {
            label: format!("{threshold:.1} {unit} or below"),
            rule: BucketRule::AtOrBelow { threshold },
        }
    }

    /// Creates a closed-range bucket, inclusive on both ends.
    ///
    /// # Errors
    /// Returns [`BucketError::InvalidRange`] when `low > high` - an inverted
    /// range is a construction bug, never a silently-false bucket.
    pub fn between(low: f64, high: f64, unit: &str) -> Result<Self, BucketError> {
        if low > high {
            return Err(BucketError::InvalidRange { low, high });
        }
        Ok(Self {
            label: format!("{low:.1} to {high:.1} {unit}"),
            rule: BucketRule::Between { low, high },
        })
    }

    /// Resolves this bucket against an observed value.
    ///
    /// Adjacent buckets share their boundary point; observed values are
    /// continuous, so a shared boundary carries zero probability mass.
    #[must_use]
    pub fn resolves(&self, value: f64) -> bool {
        match self.rule {
            BucketRule::AtOrAbove { threshold } => value >= threshold,
            BucketRule::AtOrBelow { threshold } => value <= threshold,
            BucketRule::Between { low, high } => value >= low && value <= high,
        }
    }
}

/// Builds a climatological bucket set from a historical sample.
///
/// The 5th and 95th percentiles (linearly interpolated) are rounded outward
/// to the nearest `width` multiple; the result is one low tail, closed
/// ranges of `width` between the rounded edges, and one high tail.
///
/// Callers must check [`MIN_BUCKET_COUNT`] and skip the event when the
/// sample is too narrow to produce at least one closed range.
///
/// # Errors
/// Returns [`BucketError::EmptySample`] for an empty sample and
/// [`BucketError::InvalidWidth`] for a non-positive width.
pub fn climatological_buckets(
    sample: &[f64],
    width: f64,
    unit: &str,
) -> Result<Vec<Bucket>, BucketError> {
    if sample.is_empty() {
        return Err(BucketError::EmptySample);
    }
    if width <= 0.0 {
        return Err(BucketError::InvalidWidth(width));
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let p5 = percentile(&sorted, LOW_QUANTILE);
    let p95 = percentile(&sorted, HIGH_QUANTILE);

    // Round outward so the closed ranges cover the climatological bulk.
    let low_edge = (p5 / width).floor() * width;
    let high_edge = (p95 / width).ceil() * width;

    // Index-based stepping avoids float drift; the final range is snapped
    // to the high edge so the seam against the high tail is exact.
    let n_ranges = ((high_edge - low_edge) / width).round().max(0.0) as usize;

    let mut buckets = vec![Bucket::at_or_below(low_edge, unit)];
    for i in 0..n_ranges {
        let low = low_edge + i as f64 * width;
        let high = if i == n_ranges - 1 {
            high_edge
        } else {
            low_edge + (i + 1) as f64 * width
        };
        buckets.push(Bucket::between(low, high, unit)?);
    }
    buckets.push(Bucket::at_or_above(high_edge, unit));

    Ok(buckets)
}
