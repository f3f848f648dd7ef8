//! Pacing between external calls.
//!
//! Both public OSM services ban clients that hammer them, so every network
//! call is followed by a pause, with a longer one after failures. The pause
//! goes through the [`Throttle`] trait so tests can run without sleeping.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the pipeline between external calls.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Waits for `delay` (or pretends to).
    async fn pause(&self, delay: Duration);
}

/// Real delays via `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioThrottle;

#[async_trait]
impl Throttle for TokioThrottle {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Delays applied by a pass, per external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after every external call.
    pub request_delay: Duration,
    /// Additional pause after a failed call.
    pub error_backoff: Duration,
}

impl Pacing {
    #[must_use]
    pub const fn from_millis(request_delay_ms: u64, error_backoff_ms: u64) -> Self {
        Self {
            request_delay: Duration::from_millis(request_delay_ms),
            error_backoff: Duration::from_millis(error_backoff_ms),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::Throttle;

    /// Records requested pauses instead of sleeping.
    #[derive(Debug, Default)]
    pub struct RecordingThrottle {
        pauses: Mutex<Vec<Duration>>,
    }

    impl RecordingThrottle {
        pub fn pauses(&self) -> Vec<Duration> {
            self.pauses.lock().unwrap().clone()
        }

        pub fn total(&self) -> Duration {
            self.pauses().iter().sum()
        }
    }

    #[async_trait]
    impl Throttle for RecordingThrottle {
        async fn pause(&self, delay: Duration) {
            self.pauses.lock().unwrap().push(delay);
        }
    }
}
