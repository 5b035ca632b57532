pub mod bucket;
pub mod config;
pub mod metric;
pub mod probability;
pub mod signal;
pub mod stats;

pub use bucket::{climatological_buckets, Bucket, BucketError, BucketRule, MIN_BUCKET_COUNT};
pub use config::{BacktestConfig, ConfigLoader};
pub use metric::{Aggregation, DataSource, MetricError, MetricProfile, WeatherMetric};
pub use probability::{
    bucket_probability, clamp_probability, ensemble_probability, normal_probability,
    ForecastDistribution, MIN_ENSEMBLE_MEMBERS, PROB_CEIL, PROB_FLOOR,
};
pub use signal::{
    compute_signal, compute_signals, models_agree, SizingParams, TradeAction, TradeSignal,
    DEFAULT_MIN_EDGE, MAX_KELLY_FRACTION,
};
pub use stats::{
    linear_fit, mean, normal_cdf, percentile, sample_normal, sample_poisson, sample_std_dev,
    seeded_rng, LinearFit,
};
