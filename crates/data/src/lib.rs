pub mod memory;
pub mod provider;
pub mod throttle;
pub mod types;

pub use memory::{
    MemoryEventProvider, MemoryForecastProvider, MemoryHistoricalProvider, MemoryIndexProvider,
};
pub use provider::{DataError, EventProvider, ForecastProvider, HistoricalProvider, IndexProvider};
pub use throttle::FetchThrottle;
pub use types::{DailyObservation, EnsembleResult, Location, MonthlyAnomaly, PointEvent};
