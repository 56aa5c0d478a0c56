//! Process-wide request spacing for the retrieval API.
//!
//! The watermark is the instant of the last dispatch. `acquire` holds the lock
//! while it waits, so concurrent callers queue up and each one's wait starts
//! only after the previous dispatch instant has been recorded.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval dispatch gate.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a throttle with the given spacing.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_dispatch: Mutex::new(None) }
    }

    /// Wait until a dispatch is allowed and return the recorded dispatch instant.
    pub async fn acquire(&self) -> Instant {
        let mut last = self.last_dispatch.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                tracing::debug!(
                    wait_ms = ready_at.saturating_duration_since(Instant::now()).as_millis(),
                    "Throttling request"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        // Recorded after resuming, not at call time.
        let dispatched = Instant::now();
        *last = Some(dispatched);
        dispatched
    }
}
