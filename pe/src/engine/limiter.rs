//! Process-wide rate limiter for assistant service calls
//!
//! Enforces a minimum gap between consecutive upstream calls. The last-call
//! instant lives behind an async mutex that is held across the gap sleep, so
//! concurrent pipelines serialize here and none can observe a stale timestamp.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Minimum-gap rate limiter shared by every upstream call site
pub struct RateLimiter {
    min_gap: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum gap between calls
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the minimum gap since the previous call has elapsed
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_gap {
                let remaining = self.min_gap - elapsed;
                debug!(?remaining, "acquire: sleeping to honor minimum gap");
                sleep(remaining).await;
            }
        }

        *last = Some(Instant::now());
    }
}
