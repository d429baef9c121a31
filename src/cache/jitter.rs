//! Refresh jitter for per-group instance caches.
//!
//! Spreading expiries keeps many groups with the same TTL from refreshing
//! against the remote API in the same instant.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Source of the random offset added to a refresh deadline.
pub trait JitterSource: Send + Sync + fmt::Debug {
    /// An offset in `[0, window]`. A zero window always yields zero.
    fn offset(&self, window: Duration) -> Duration;
}

/// Uniformly random offset, millisecond resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn offset(&self, window: Duration) -> Duration {
        let max_millis = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        if max_millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_millis))
    }
}

/// Always the same offset, clamped to the window. Handy for tests and for
/// disabling jitter (`FixedJitter(Duration::ZERO)`).
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl JitterSource for FixedJitter {
    fn offset(&self, window: Duration) -> Duration {
        self.0.min(window)
    }
}
