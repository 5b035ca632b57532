//! Probability engine: bucket probabilities from ensembles or a Normal fit.
//!
//! All distribution builders emit the same [`ForecastDistribution`] shape,
//! so the estimator here never cares whether members came from a real
//! multi-model ensemble, a Poisson synthesis, or a trend regression.

use serde::{Deserialize, Serialize};

use crate::bucket::{Bucket, BucketRule};
use crate::stats::{mean, normal_cdf, sample_std_dev};

/// Minimum pooled member count for the empirical estimator; below this the
/// Laplace-smoothed hit rate is noisier than the Normal fallback.
pub const MIN_ENSEMBLE_MEMBERS: usize = 5;

/// Probability floor applied to every estimate handed to the Kelly step.
pub const PROB_FLOOR: f64 = 0.01;

/// Probability ceiling applied to every estimate handed to the Kelly step.
pub const PROB_CEIL: f64 = 0.99;

/// A pooled sample of forecast members for one location and date.
///
/// Built once per event and shared read-only across every bucket computed
/// against it; the expensive fetch happens once, the probabilities N times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDistribution {
    /// Source label (model name, "pooled", "earthquake_synthetic", ...).
    pub label: String,
    /// Member values in the metric's primary unit.
    pub members: Vec<f64>,
    /// Number of members (kept explicit for serialized summaries).
    pub member_count: usize,
}

impl ForecastDistribution {
    /// Creates a distribution from a member list.
    #[must_use]
    pub fn new(label: impl Into<String>, members: Vec<f64>) -> Self {
        let member_count = members.len();
        Self {
            label: label.into(),
            members,
            member_count,
        }
    }

    /// Mean of the members (0.0 when empty).
    #[must_use]
    pub fn mean(&self) -> f64 {
        mean(&self.members)
    }

    /// Sample standard deviation of the members.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        sample_std_dev(&self.members)
    }

    /// True when the member count supports the empirical estimator.
    #[must_use]
    pub fn supports_empirical(&self) -> bool {
        self.member_count >= MIN_ENSEMBLE_MEMBERS
    }
}

/// Empirical bucket probability with Laplace smoothing.
///
/// `(hits + 1) / (n + 2)` never returns exactly 0 or 1, even for unanimous
/// ensembles, which keeps the downstream Kelly math well-defined.
#[must_use]
pub fn ensemble_probability(bucket: &Bucket, members: &[f64]) -> f64 {
    let hits = members.iter().filter(|m| bucket.resolves(**m)).count();
    let p = (hits as f64 + 1.0) / (members.len() as f64 + 2.0);
    clamp_probability(p)
}

/// Normal-CDF bucket probability for when no usable ensemble exists.
///
/// Open tails are a single CDF evaluation; closed ranges are the CDF
/// difference between the bounds. A non-positive sigma degenerates to a
/// point mass at `mean`.
#[must_use]
pub fn normal_probability(bucket: &Bucket, mean: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return if bucket.resolves(mean) {
            PROB_CEIL
        } else {
            PROB_FLOOR
        };
    }

    let p = match bucket.rule {
        BucketRule::AtOrAbove { threshold } => 1.0 - normal_cdf((threshold - mean) / sigma),
        BucketRule::AtOrBelow { threshold } => normal_cdf((threshold - mean) / sigma),
        BucketRule::Between { low, high } => {
            normal_cdf((high - mean) / sigma) - normal_cdf((low - mean) / sigma)
        }
    };
    clamp_probability(p)
}

/// Bucket probability for a prefetched distribution.
///
/// Uses the empirical estimator when the ensemble is large enough,
/// otherwise falls back to a Normal around the available mean with
/// `fallback_sigma` (typically the metric profile's default sigma).
#[must_use]
pub fn bucket_probability(
    bucket: &Bucket,
    dist: &ForecastDistribution,
    fallback_sigma: f64,
) -> f64 {
    if dist.supports_empirical() {
        ensemble_probability(bucket, &dist.members)
    } else {
        normal_probability(bucket, dist.mean(), fallback_sigma)
    }
}

/// Clamps a probability into `[PROB_FLOOR, PROB_CEIL]`.
#[must_use]
pub fn clamp_probability(p: f64) -> f64 {
    p.clamp(PROB_FLOOR, PROB_CEIL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn above(threshold: f64) -> Bucket {
        Bucket::at_or_above(threshold, "°C")
    }

    // ============================================================
    // Ensemble Estimator Tests
    // ============================================================

    #[test]
    fn laplace_smoothing_sixty_of_hundred() {
        let members: Vec<f64> = (0..100).map(|i| if i < 60 { 25.0 } else { 15.0 }).collect();
        let p = ensemble_probability(&above(20.0), &members);

        // (60 + 1) / (100 + 2)
        assert!((p - 61.0 / 102.0).abs() < 1e-12, "p was {p}");
    }

    #[test]
    fn unanimous_ensemble_never_reaches_one() {
        let members = vec![30.0; 50];
        let p = ensemble_probability(&above(20.0), &members);

        assert!(p < 1.0);
        assert!((p - 51.0 / 52.0).abs() < 1e-12);
    }

    #[test]
    fn unanimous_miss_never_reaches_zero() {
        let members = vec![10.0; 50];
        let p = ensemble_probability(&above(20.0), &members);

        assert!(p > 0.0);
        assert!((p - clamp_probability(1.0 / 52.0)).abs() < 1e-12);
    }

    #[test]
    fn empty_member_list_is_clamped_half() {
        // (0 + 1) / (0 + 2) = 0.5
        let p = ensemble_probability(&above(20.0), &[]);
        assert!((p - 0.5).abs() < 1e-12);
    }

    // ============================================================
    // Normal Fallback Tests
    // ============================================================

    #[test]
    fn normal_tail_at_mean_is_half() {
        let p = normal_probability(&above(20.0), 20.0, 2.0);
        assert!((p - 0.5).abs() < 1e-6);
    }

    #[test]
    fn normal_low_tail_mirrors_high_tail() {
        let high = normal_probability(&above(22.0), 20.0, 2.0);
        let low = normal_probability(&Bucket::at_or_below(18.0, "°C"), 20.0, 2.0);
        assert!((high - low).abs() < 1e-9);
    }

    #[test]
    fn normal_range_is_cdf_difference() {
        let bucket = Bucket::between(18.0, 22.0, "°C").unwrap();
        let p = normal_probability(&bucket, 20.0, 2.0);

        // One sigma either side of the mean: ~68.3%
        assert!((p - 0.6827).abs() < 1e-3, "p was {p}");
    }

    #[test]
    fn normal_zero_sigma_degenerates_to_point_mass() {
        assert!((normal_probability(&above(20.0), 25.0, 0.0) - PROB_CEIL).abs() < f64::EPSILON);
        assert!((normal_probability(&above(20.0), 15.0, 0.0) - PROB_FLOOR).abs() < f64::EPSILON);
    }

    #[test]
    fn normal_far_tail_clamps_to_floor() {
        let p = normal_probability(&above(100.0), 20.0, 2.0);
        assert!((p - PROB_FLOOR).abs() < f64::EPSILON);
    }

    // ============================================================
    // Dispatch Tests
    // ============================================================

    #[test]
    fn large_ensemble_uses_empirical_path() {
        let dist = ForecastDistribution::new("pooled", vec![25.0, 25.0, 25.0, 15.0, 15.0]);
        let p = bucket_probability(&above(20.0), &dist, 2.0);

        // (3 + 1) / (5 + 2)
        assert!((p - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn small_ensemble_falls_back_to_normal() {
        let dist = ForecastDistribution::new("thin", vec![20.0, 20.0]);
        let p = bucket_probability(&above(20.0), &dist, 2.0);

        // Normal around mean 20 with sigma 2: tail at the mean ~0.5
        assert!((p - 0.5).abs() < 1e-6);
    }

    // ============================================================
    // Clamp Property
    // ============================================================

    #[test]
    fn probability_always_within_clamp_bounds() {
        let buckets = [
            above(0.0),
            Bucket::at_or_below(-50.0, "°C"),
            Bucket::between(-1.0, 1.0, "°C").unwrap(),
        ];
        let ensembles: [&[f64]; 3] = [&[], &[100.0; 20], &[-100.0; 20]];

        for bucket in &buckets {
            for members in ensembles {
                let p = ensemble_probability(bucket, members);
                assert!((PROB_FLOOR..=PROB_CEIL).contains(&p));
            }
            for (mean, sigma) in [(0.0, 1.0), (1000.0, 0.001), (-1000.0, 50.0)] {
                let p = normal_probability(bucket, mean, sigma);
                assert!((PROB_FLOOR..=PROB_CEIL).contains(&p));
            }
        }
    }

    #[test]
    fn distribution_stats_and_serde() {
        let dist = ForecastDistribution::new("gfs", vec![1.0, 2.0, 3.0]);
        assert_eq!(dist.member_count, 3);
        assert!((dist.mean() - 2.0).abs() < 1e-12);
        assert!((dist.std_dev() - 1.0).abs() < 1e-12);

        let json = serde_json::to_string(&dist).unwrap();
        let back: ForecastDistribution = serde_json::from_str(&json).unwrap();
        assert_eq!(back.member_count, dist.member_count);
        assert_eq!(back.label, "gfs");
    }
}
