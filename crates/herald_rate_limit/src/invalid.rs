//! Rolling count of invalid requests (401, 403 and 429 responses).
//!
//! The upstream API throttles invalid requests per IP address, not per token,
//! so the count is meant to be shared by every dispatcher in the process.
//! Updates from concurrent requests may interleave; the count can lag by a
//! few increments but every multiple of the warning interval is still seen
//! by exactly the request that reached it.

use derive_getters::Getters;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Length of the invalid-request accounting window.
pub const INVALID_REQUEST_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Emitted when the invalid-request count reaches a multiple of the warning interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct InvalidRequestWarning {
    /// Invalid requests seen in the current window
    count: u64,
    /// Time left before the window resets
    remaining_time: Duration,
}

#[derive(Debug, Default)]
struct InvalidState {
    count: u64,
    reset_at: Option<Instant>,
}

/// Process-wide invalid request counter.
///
/// # Example
///
/// ```
/// use herald_rate_limit::InvalidRequestTracker;
///
/// # #[tokio::main]
/// # async fn main() {
/// let tracker = InvalidRequestTracker::default();
/// assert!(tracker.record(2).is_none());
/// let warning = tracker.record(2).expect("second invalid request warns");
/// assert_eq!(*warning.count(), 2);
/// # }
/// ```
#[derive(Debug)]
pub struct InvalidRequestTracker {
    window: Duration,
    state: Mutex<InvalidState>,
}

impl Default for InvalidRequestTracker {
    fn default() -> Self {
        Self::new(INVALID_REQUEST_WINDOW)
    }
}

impl InvalidRequestTracker {
    /// Create a tracker with a custom window length.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(InvalidState::default()),
        }
    }

    /// Count one invalid request.
    ///
    /// Returns a warning when `warning_interval` is non-zero and the new
    /// count is a multiple of it. The window restarts from zero once expired.
    pub fn record(&self, warning_interval: u32) -> Option<InvalidRequestWarning> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let reset_at = match state.reset_at {
            Some(reset_at) if reset_at > now => reset_at,
            _ => {
                let reset_at = now + self.window;
                state.reset_at = Some(reset_at);
                state.count = 0;
                reset_at
            }
        };

        state.count += 1;
        debug!(count = state.count, "Invalid request recorded");

        if warning_interval == 0 || state.count % u64::from(warning_interval) != 0 {
            return None;
        }

        let warning = InvalidRequestWarning {
            count: state.count,
            remaining_time: reset_at - now,
        };
        warn!(
            count = warning.count,
            remaining_ms = warning.remaining_time.as_millis() as u64,
            "Invalid request threshold reached"
        );
        Some(warning)
    }

    /// Invalid requests counted in the current window.
    pub fn count(&self) -> u64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.reset_at {
            Some(reset_at) if reset_at > Instant::now() => state.count,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_warns_on_every_multiple() {
        let tracker = InvalidRequestTracker::default();
        let warnings: Vec<_> = (0..5).filter_map(|_| tracker.record(2)).collect();

        assert_eq!(warnings.len(), 2);
        assert_eq!(*warnings[0].count(), 2);
        assert_eq!(*warnings[1].count(), 4);
        assert_eq!(*warnings[0].remaining_time(), INVALID_REQUEST_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_warns() {
        let tracker = InvalidRequestTracker::default();
        for _ in 0..10 {
            assert!(tracker.record(0).is_none());
        }
        assert_eq!(tracker.count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_resets_count() {
        let tracker = InvalidRequestTracker::new(Duration::from_secs(60));
        tracker.record(0);
        tracker.record(0);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(tracker.count(), 0);

        tracker.record(0);
        assert_eq!(tracker.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_time_shrinks() {
        let tracker = InvalidRequestTracker::new(Duration::from_secs(60));
        tracker.record(1);

        tokio::time::advance(Duration::from_secs(20)).await;
        let warning = tracker.record(1).expect("interval of one always warns");
        assert_eq!(*warning.remaining_time(), Duration::from_secs(40));
    }
}
