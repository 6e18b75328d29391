//! Fixed-window global request budget.
//!
//! Every request, first attempt or retry, passes through [`GlobalLimiter::acquire`]
//! right before it is handed to the transport. The limiter keeps two numbers:
//! how many requests remain in the current window and when that window ends.
//!
//! The check and the decrement are two separate critical sections. Two routing
//! keys that pass the check at the same instant may both decrement, leaving
//! `remaining` below zero for the rest of the window. That overshoot is bounded
//! by the number of keys sending concurrently and matches the upstream API's
//! own tolerance, so it is accepted instead of serializing every key behind
//! one lock.

use derive_getters::Getters;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};

#[derive(Debug)]
struct WindowState {
    /// Requests left in the current window; negative after a benign race
    remaining: i64,
    /// End of the current window, `None` before the first request
    reset_at: Option<Instant>,
}

/// Point-in-time view of the limiter, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct LimiterSnapshot {
    /// Requests left in the current window
    remaining: i64,
    /// Time until the current window ends (zero when already expired)
    reset_in: Duration,
    /// Whether a request arriving now would have to wait
    limited: bool,
}

/// Global request budget shared by every routing key of a dispatcher.
///
/// # Example
///
/// ```
/// use herald_rate_limit::GlobalLimiter;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let limiter = GlobalLimiter::new(50, Duration::from_secs(1), Duration::from_millis(50));
/// limiter.acquire().await;
/// assert_eq!(*limiter.snapshot().remaining(), 49);
/// # }
/// ```
#[derive(Debug)]
pub struct GlobalLimiter {
    budget: u32,
    window: Duration,
    offset: Duration,
    state: Mutex<WindowState>,
}

impl GlobalLimiter {
    /// Create a limiter allowing `budget` requests per `window`.
    ///
    /// `offset` is added to every computed wait to absorb clock skew between
    /// us and the API. A budget of zero is treated as one.
    pub fn new(budget: u32, window: Duration, offset: Duration) -> Self {
        let budget = budget.max(1);
        debug!(
            budget,
            window_ms = window.as_millis() as u64,
            offset_ms = offset.as_millis() as u64,
            "Creating global limiter"
        );
        Self {
            budget,
            window,
            offset,
            state: Mutex::new(WindowState {
                remaining: i64::from(budget),
                reset_at: None,
            }),
        }
    }

    /// Requests allowed per window.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Length of one window.
    pub fn window(&self) -> Duration {
        self.window
    }

    fn state(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How long a request arriving now must wait, or `None` if it may proceed.
    ///
    /// The wait includes the safety offset.
    pub fn limited_for(&self) -> Option<Duration> {
        let state = self.state();
        let now = Instant::now();
        match state.reset_at {
            Some(reset_at) if state.remaining <= 0 && now < reset_at => {
                Some(reset_at + self.offset - now)
            }
            _ => None,
        }
    }

    /// Wait until the budget allows a request, then take one slot.
    ///
    /// Re-evaluates after every sleep, since a 429 seen by another key can
    /// push the window further out while we wait.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        while let Some(wait) = self.limited_for() {
            debug!(
                wait_ms = wait.as_millis() as u64,
                "Global rate limit hit, blocking request"
            );
            tokio::time::sleep(wait).await;
        }
        self.consume();
    }

    /// Take one slot without waiting, rolling the window forward if it expired.
    ///
    /// Never fails: callers that skipped [`acquire`](Self::acquire) simply
    /// drive `remaining` negative.
    pub fn consume(&self) {
        let mut state = self.state();
        let now = Instant::now();
        let expired = state.reset_at.is_none_or(|reset_at| now >= reset_at);
        if expired {
            state.reset_at = Some(now + self.window);
            state.remaining = i64::from(self.budget);
            trace!(budget = self.budget, "Global window rolled over");
        }
        state.remaining -= 1;
        trace!(remaining = state.remaining, "Global slot consumed");
    }

    /// Stall every request for `retry_after`, as instructed by a 429 response.
    pub fn penalize(&self, retry_after: Duration) {
        let mut state = self.state();
        state.remaining = 0;
        state.reset_at = Some(Instant::now() + retry_after);
        warn!(
            retry_after_ms = retry_after.as_millis() as u64,
            "Global budget exhausted by rate limit response"
        );
    }

    /// Current limiter state.
    pub fn snapshot(&self) -> LimiterSnapshot {
        let state = self.state();
        let now = Instant::now();
        let reset_in = state
            .reset_at
            .map(|reset_at| reset_at.saturating_duration_since(now))
            .unwrap_or_default();
        LimiterSnapshot {
            remaining: state.remaining,
            reset_in,
            limited: state.remaining <= 0 && reset_in > Duration::ZERO,
        }
    }
}
