//! Poisson-frequency earthquake synthesis.
//!
//! No forecast model predicts earthquakes, so the distribution is built
//! from the historical catalog instead: event frequency gives a Poisson
//! rate, and magnitudes are redrawn from the observed catalog.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use weather_edge_core::probability::ForecastDistribution;
use weather_edge_core::stats::sample_poisson;
use weather_edge_data::PointEvent;

/// Synthetic members generated per distribution.
pub const DEFAULT_SYNTHETIC_MEMBERS: usize = 1000;

/// Minimum catalog size for the empirical rate fit. Below this the rate
/// estimate is dominated by sampling noise.
pub const MIN_EVENTS_FOR_EMPIRICAL: usize = 5;

/// Label attached to synthesized distributions.
pub const SYNTHETIC_LABEL: &str = "earthquake_synthetic";

/// Per-member event chance in the low-seismicity fallback.
const FLAT_EVENT_PROB: f64 = 0.005;

/// Magnitude range drawn for a fallback event.
const FLAT_MAGNITUDE_LOW: f64 = 4.5;
const FLAT_MAGNITUDE_HIGH: f64 = 5.5;

/// Synthesizes a max-magnitude distribution for a target window.
///
/// The empirical daily rate is `count / (window_years * 365.25)`. Each
/// member draws an event count from Poisson(rate * horizon), then takes
/// the maximum of that many magnitudes redrawn with replacement from the
/// catalog; a count of zero yields a member of 0.0 (no qualifying event).
///
/// Catalogs below [`MIN_EVENTS_FOR_EMPIRICAL`] switch to a flat
/// low-seismicity generator: roughly 0.5% of members carry a moderate
/// event, the rest are 0.0.
#[must_use]
pub fn synthesize_max_magnitude(
    catalog: &[PointEvent],
    window_years: f64,
    horizon_days: f64,
    member_count: usize,
    rng: &mut ChaCha8Rng,
) -> ForecastDistribution {
    if catalog.len() < MIN_EVENTS_FOR_EMPIRICAL {
        debug!(
            events = catalog.len(),
            "catalog too thin for empirical rate, using flat generator"
        );
        return flat_low_seismicity(member_count, rng);
    }

    let daily_rate = catalog.len() as f64 / (window_years * 365.25);
    let lambda = daily_rate * horizon_days;
    let magnitudes: Vec<f64> = catalog.iter().map(|e| e.magnitude).collect();

    let members = (0..member_count)
        .map(|_| {
            let count = sample_poisson(rng, lambda);
            if count == 0 {
                return 0.0;
            }
            (0..count)
                .map(|_| magnitudes[rng.gen_range(0..magnitudes.len())])
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect();

    ForecastDistribution::new(SYNTHETIC_LABEL, members)
}

/// Flat generator for regions with too few recorded events.
fn flat_low_seismicity(member_count: usize, rng: &mut ChaCha8Rng) -> ForecastDistribution {
    let members = (0..member_count)
        .map(|_| {
            if rng.gen::<f64>() < FLAT_EVENT_PROB {
                rng.gen_range(FLAT_MAGNITUDE_LOW..FLAT_MAGNITUDE_HIGH)
            } else {
                0.0
            }
        })
        .collect();
    ForecastDistribution::new(SYNTHETIC_LABEL, members)
}
