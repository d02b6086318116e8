//! Resilience primitives for enrichment.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

/// Per-source rate limiter.
///
/// Limits throughput to one request per interval by combining a
/// single-permit [`Semaphore`] with a fixed sleep.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    /// Creates a new `RateLimiter` that allows at most
    /// `requests_per_second` requests per second.
    pub fn new(requests_per_second: u32) -> Self {
        Self::with_interval(Duration::from_millis(
            1000 / u64::from(requests_per_second.max(1)),
        ))
    }

    /// Creates a `RateLimiter` that spaces requests `interval` apart.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a request slot is available, then holds the slot for
    /// the configured interval to enforce the rate limit.
    pub async fn acquire(&self) {
        // The semaphore is never closed; a closed one only disables the wait.
        let _permit = self.semaphore.acquire().await.ok();
        sleep(self.interval).await;
    }
}
