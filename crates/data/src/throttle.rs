//! Fetch throttling shared across providers.
//!
//! Upstream weather APIs meter by caller, not by endpoint, so one
//! throttle instance is shared across every provider hitting the same
//! upstream. A pooled multi-model fetch acquires once for the batch; the
//! models inside the batch run in parallel.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use tracing::trace;

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Rate limiter gating upstream fetches.
#[derive(Clone)]
pub struct FetchThrottle {
    limiter: Arc<DirectLimiter>,
}

impl FetchThrottle {
    /// Creates a throttle at the default 60 requests per minute.
    #[must_use]
    pub fn new() -> Self {
        Self::per_minute(nonzero!(60u32))
    }

    /// Creates a throttle with a custom per-minute quota.
    #[must_use]
    pub fn per_minute(requests_per_minute: NonZeroU32) -> Self {
        let quota = Quota::per_minute(requests_per_minute);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Waits until one fetch slot is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
        trace!("fetch slot acquired");
    }
}

impl Default for FetchThrottle {
    fn default() -> Self {
        Self::new()
    }
}
