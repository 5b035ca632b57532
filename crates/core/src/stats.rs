//! Statistical primitives shared across the probability and backtest engines.
//!
//! Everything here is a pure function over slices plus two sampling helpers
//! that take an explicit `ChaCha8Rng` so callers control determinism.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Coefficients for the Abramowitz & Stegun 26.2.17 rational approximation
/// to the standard Normal CDF (max absolute error ~7.5e-8).
const AS_B1: f64 = 0.319_381_530;
const AS_B2: f64 = -0.356_563_782;
const AS_B3: f64 = 1.781_477_937;
const AS_B4: f64 = -1.821_255_978;
const AS_B5: f64 = 1.330_274_429;
const AS_P: f64 = 0.231_641_9;

/// Result of an ordinary least-squares linear fit.
#[derive(Debug, Clone, Copy)]
pub struct LinearFit {
    /// Slope of the fitted line.
    pub slope: f64,
    /// Y-intercept of the fitted line.
    pub intercept: f64,
    /// Sample standard deviation of the residuals around the line.
    pub residual_std: f64,
}

impl LinearFit {
    /// Evaluates the fitted line at `x`.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator). Returns 0.0 for fewer
/// than two values.
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Linearly-interpolated percentile of a pre-sorted slice.
///
/// # Arguments
/// * `sorted` - Values sorted ascending
/// * `q` - Quantile in [0, 1] (e.g. 0.05 for the 5th percentile)
///
/// # Returns
/// The interpolated value, or 0.0 for an empty slice.
#[must_use]
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let q = q.clamp(0.0, 1.0);
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Standard Normal cumulative distribution function.
///
/// Uses the Abramowitz & Stegun rational approximation rather than a full
/// erf implementation; the error bound (~7.5e-8) is far below anything the
/// edge math can resolve.
#[must_use]
pub fn normal_cdf(z: f64) -> f64 {
    if z < 0.0 {
        return 1.0 - normal_cdf(-z);
    }
    let t = 1.0 / (1.0 + AS_P * z);
    let poly = t * (AS_B1 + t * (AS_B2 + t * (AS_B3 + t * (AS_B4 + t * AS_B5))));
    let pdf = (-z * z / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();
    1.0 - pdf * poly
}

/// Fits `y = slope * x + intercept` by ordinary least squares.
///
/// Degenerate inputs (fewer than two points, mismatched lengths, or zero
/// variance in `x`) produce a flat line through the mean with the sample
/// standard deviation of `y` as the residual spread.
#[must_use]
pub fn linear_fit(x: &[f64], y: &[f64]) -> LinearFit {
    let n = x.len();
    if n < 2 || n != y.len() {
        return LinearFit {
            slope: 0.0,
            intercept: mean(y),
            residual_std: sample_std_dev(y),
        };
    }

    let mean_x = mean(x);
    let mean_y = mean(y);
    let ss_xx: f64 = x.iter().map(|xi| (xi - mean_x) * (xi - mean_x)).sum();
    if ss_xx == 0.0 {
        return LinearFit {
            slope: 0.0,
            intercept: mean_y,
            residual_std: sample_std_dev(y),
        };
    }
    let ss_xy: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;

    let residuals: Vec<f64> = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| yi - (slope * xi + intercept))
        .collect();

    LinearFit {
        slope,
        intercept,
        residual_std: sample_std_dev(&residuals),
    }
}

/// Draws one sample from `Normal(mean, std)` via the Box-Muller transform.
#[must_use]
pub fn sample_normal(rng: &mut ChaCha8Rng, mean: f64, std: f64) -> f64 {
    if std <= 0.0 {
        return mean;
    }
    // gen_range over (0, 1]: avoid ln(0)
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std * z
}

/// Draws one sample from `Poisson(lambda)` by inverse-CDF (multiplicative)
/// sampling. Returns 0 for `lambda <= 0`.
///
/// Intended for the small rates the earthquake synthesizer produces
/// (lambda well under 10); it is exact but O(lambda) per draw.
#[must_use]
pub fn sample_poisson(rng: &mut ChaCha8Rng, lambda: f64) -> u32 {
    if lambda <= 0.0 {
        return 0;
    }
    let limit = (-lambda).exp();
    let mut k = 0u32;
    let mut p = 1.0f64;
    loop {
        p *= rng.gen::<f64>();
        if p <= limit {
            return k;
        }
        k += 1;
        // A pathological lambda should not spin forever.
        if k > 10_000 {
            return k;
        }
    }
}

/// Builds a `ChaCha8Rng` from an optional seed.
///
/// `Some(seed)` gives reproducible draws for tests and repeatable backtests;
/// `None` seeds from OS entropy, so Monte Carlo variation across runs is
/// expected.
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}
