//! Trend-adjusted climate-index synthesis.
//!
//! Climate anomalies trend upward, so a plain historical mean would
//! systematically underprice warm outcomes. The builder fits an OLS trend
//! over recent years, extrapolates to the target year, and scatters
//! synthetic members around the trend value by the residual spread.

use rand_chacha::ChaCha8Rng;
use tracing::debug;

use weather_edge_core::probability::ForecastDistribution;
use weather_edge_core::stats::{linear_fit, mean, sample_normal, sample_std_dev};
use weather_edge_data::MonthlyAnomaly;

/// Years of history the trend fit uses.
pub const TREND_WINDOW_YEARS: usize = 30;

/// Minimum points for a trend fit; below this the builder degrades to a
/// no-trend mean.
pub const MIN_POINTS_FOR_TREND: usize = 5;

/// Floor on the residual spread, in degrees Celsius. A near-perfect fit
/// on a short series would otherwise collapse the distribution to a spike.
pub const RESIDUAL_STD_FLOOR: f64 = 0.05;

/// Label attached to synthesized distributions.
pub const TREND_LABEL: &str = "climate_trend";

/// Synthesizes an anomaly distribution for a target year.
///
/// Uses the most recent [`TREND_WINDOW_YEARS`] points of `history`. With
/// at least [`MIN_POINTS_FOR_TREND`] points the members are drawn from
/// `Normal(trend(target_year), residual_std)`; with fewer, from
/// `Normal(mean, std)` with no trend.
#[must_use]
pub fn synthesize_anomaly(
    history: &[MonthlyAnomaly],
    target_year: i32,
    member_count: usize,
    rng: &mut ChaCha8Rng,
) -> ForecastDistribution {
    let mut recent: Vec<MonthlyAnomaly> = history.to_vec();
    recent.sort_by_key(|a| a.year);
    if recent.len() > TREND_WINDOW_YEARS {
        recent.drain(..recent.len() - TREND_WINDOW_YEARS);
    }

    let anomalies: Vec<f64> = recent.iter().map(|a| a.anomaly).collect();

    let (center, spread) = if recent.len() >= MIN_POINTS_FOR_TREND {
        let years: Vec<f64> = recent.iter().map(|a| f64::from(a.year)).collect();
        let fit = linear_fit(&years, &anomalies);
        (
            fit.predict(f64::from(target_year)),
            fit.residual_std.max(RESIDUAL_STD_FLOOR),
        )
    } else {
        debug!(
            points = recent.len(),
            "too few anomaly points for a trend, using mean"
        );
        (
            mean(&anomalies),
            sample_std_dev(&anomalies).max(RESIDUAL_STD_FLOOR),
        )
    };

    let members = (0..member_count)
        .map(|_| sample_normal(rng, center, spread))
        .collect();
    ForecastDistribution::new(TREND_LABEL, members)
}

/// Bundled global anomaly history, 1995 through 2024.
///
/// Used when the live index fetch fails; a documented degradation, not
/// silent error-swallowing.
#[must_use]
pub fn fallback_anomalies() -> Vec<MonthlyAnomaly> {
    const ANOMALIES: [f64; 30] = [
        0.47, 0.33, 0.46, 0.61, 0.38, 0.39, 0.54, 0.63, 0.62, 0.53, 0.68, 0.64, 0.66, 0.54, 0.66,
        0.72, 0.61, 0.65, 0.68, 0.75, 0.90, 1.01, 0.92, 0.85, 0.98, 1.01, 0.85, 0.89, 1.17, 1.28,
    ];
    ANOMALIES
        .iter()
        .enumerate()
        .map(|(i, anomaly)| MonthlyAnomaly {
            year: 1995 + i as i32,
            anomaly: *anomaly,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_edge_core::stats::seeded_rng;

    fn linear_history(slope_per_year: f64) -> Vec<MonthlyAnomaly> {
        (1990..2020)
            .map(|year| MonthlyAnomaly {
                year,
                anomaly: 0.3 + slope_per_year * f64::from(year - 1990),
            })
            .collect()
    }

    #[test]
    fn trend_extrapolates_past_the_last_observation() {
        // Perfectly linear +0.02/year history ending at 0.88 in 2019.
        let history = linear_history(0.02);
        let mut rng = seeded_rng(Some(5));

        let dist = synthesize_anomaly(&history, 2025, 2000, &mut rng);

        // Trend value at 2025 is 0.3 + 0.02*35 = 1.0, above every
        // historical point.
        assert!((dist.mean() - 1.0).abs() < 0.01, "mean was {}", dist.mean());
    }

    #[test]
    fn perfect_fit_still_spreads_by_the_floor() {
        let history = linear_history(0.02);
        let mut rng = seeded_rng(Some(6));

        let dist = synthesize_anomaly(&history, 2025, 2000, &mut rng);

        assert!(dist.std_dev() > 0.02, "std was {}", dist.std_dev());
        assert!(dist.std_dev() < 0.10);
    }

    #[test]
    fn short_history_degrades_to_mean_without_trend() {
        let history: Vec<MonthlyAnomaly> = (2021..2024)
            .map(|year| MonthlyAnomaly {
                year,
                anomaly: 1.0,
            })
            .collect();
        let mut rng = seeded_rng(Some(7));

        let dist = synthesize_anomaly(&history, 2030, 2000, &mut rng);

        assert!((dist.mean() - 1.0).abs() < 0.01);
    }

    #[test]
    fn only_the_recent_window_feeds_the_fit() {
        // Old flat decades then a recent steep rise; the fit must follow
        // the recent window, not the flat past.
        let mut history: Vec<MonthlyAnomaly> = (1950..1995)
            .map(|year| MonthlyAnomaly {
                year,
                anomaly: 0.0,
            })
            .collect();
        history.extend((1995..2025).map(|year| MonthlyAnomaly {
            year,
            anomaly: 0.02 * f64::from(year - 1995),
        }));
        let mut rng = seeded_rng(Some(8));

        let dist = synthesize_anomaly(&history, 2026, 2000, &mut rng);

        // Recent-window trend predicts ~0.62 at 2026; blending in the
        // flat 1950-1994 era would drag this far lower.
        assert!((dist.mean() - 0.62).abs() < 0.05, "mean was {}", dist.mean());
    }

    #[test]
    fn fallback_table_covers_thirty_years() {
        let table = fallback_anomalies();
        assert_eq!(table.len(), 30);
        assert_eq!(table.first().unwrap().year, 1995);
        assert_eq!(table.last().unwrap().year, 2024);
        // The recent era is warmer than the mid-90s.
        assert!(table.last().unwrap().anomaly > table.first().unwrap().anomaly);
    }

    #[test]
    fn fixed_seed_reproduces_members() {
        let history = fallback_anomalies();
        let mut rng_a = seeded_rng(Some(21));
        let mut rng_b = seeded_rng(Some(21));

        let a = synthesize_anomaly(&history, 2025, 500, &mut rng_a);
        let b = synthesize_anomaly(&history, 2025, 500, &mut rng_b);
        assert_eq!(a.members, b.members);
    }
}
