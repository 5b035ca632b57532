//! Multi-model ensemble pooling.
//!
//! Several weather models each contribute an ensemble of members; pooling
//! flattens them into one distribution so a 30-member model counts three
//! times as much as a 10-member one. No reweighting is applied.

use chrono::NaiveDate;
use futures_util::future::join_all;
use tracing::{debug, warn};

use weather_edge_core::probability::ForecastDistribution;
use weather_edge_data::{FetchThrottle, ForecastProvider, Location};

/// Models polled by default, in fetch order.
pub const DEFAULT_MODELS: [&str; 4] = [
    "gfs_seamless",
    "icon_seamless",
    "ecmwf_ifs025",
    "gem_global",
];

/// Minimum members for a model to count toward the pool. One or two
/// members is a point forecast in disguise, not a distribution.
pub const MIN_MODEL_MEMBERS: usize = 3;

/// Label attached to the pooled distribution.
pub const POOLED_LABEL: &str = "pooled";

/// A pooled distribution plus the surviving per-model distributions.
#[derive(Debug, Clone)]
pub struct PooledEnsemble {
    /// All surviving members flattened together.
    pub combined: ForecastDistribution,
    /// Each surviving model's own distribution, in fetch order.
    pub per_model: Vec<ForecastDistribution>,
}

/// Fetches every model in parallel and pools the survivors.
///
/// The throttle is acquired once for the batch; the per-model fetches
/// inside the batch run concurrently. A failing model is logged and
/// skipped. Returns `Ok(None)` when no model survives, which callers
/// treat as "no tradeable forecast today" rather than an error.
///
/// # Errors
/// Currently infallible beyond the `Option`; the `Result` keeps the
/// signature uniform with the other builders.
pub async fn pool_models(
    provider: &dyn ForecastProvider,
    throttle: &FetchThrottle,
    location: &Location,
    date: NaiveDate,
    metric: &str,
    models: &[&str],
) -> anyhow::Result<Option<PooledEnsemble>> {
    throttle.acquire().await;

    let fetches = models
        .iter()
        .map(|model| provider.fetch_ensemble(location, date, metric, model));
    let results = join_all(fetches).await;

    let mut per_model = Vec::new();
    let mut combined_members = Vec::new();

    for (model, result) in models.iter().zip(results) {
        match result {
            Ok(ensemble) if ensemble.member_count() >= MIN_MODEL_MEMBERS => {
                combined_members.extend_from_slice(&ensemble.members);
                per_model.push(ForecastDistribution::new(*model, ensemble.members));
            }
            Ok(ensemble) => {
                debug!(
                    model,
                    members = ensemble.member_count(),
                    "model below member minimum, skipping"
                );
            }
            Err(err) => {
                warn!(model, %err, "model fetch failed, skipping");
            }
        }
    }

    if per_model.is_empty() {
        debug!(location = %location.name, %date, "no model survived pooling");
        return Ok(None);
    }

    Ok(Some(PooledEnsemble {
        combined: ForecastDistribution::new(POOLED_LABEL, combined_members),
        per_model,
    }))
}
