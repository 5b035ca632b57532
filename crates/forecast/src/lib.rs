pub mod builder;
pub mod climate;
pub mod earthquake;
pub mod ensemble;

pub use builder::{build_distribution, BuiltDistribution, Providers};
pub use climate::{fallback_anomalies, synthesize_anomaly, RESIDUAL_STD_FLOOR, TREND_WINDOW_YEARS};
pub use earthquake::{
    synthesize_max_magnitude, DEFAULT_SYNTHETIC_MEMBERS, MIN_EVENTS_FOR_EMPIRICAL,
};
pub use ensemble::{pool_models, PooledEnsemble, DEFAULT_MODELS, MIN_MODEL_MEMBERS};
