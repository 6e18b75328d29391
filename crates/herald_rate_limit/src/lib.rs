//! Shared rate limit state for the Herald dispatcher.
//!
//! Two pieces of process-wide mutable state live here:
//!
//! - [`GlobalLimiter`] - the fixed-window request budget every outgoing
//!   request passes through, including the stall imposed by 429 responses.
//! - [`InvalidRequestTracker`] - the rolling 10-minute count of 401/403/429
//!   responses used to warn before the upstream API starts rejecting the
//!   whole IP.
//!
//! Neither is a hidden singleton. Both are plain values meant to be wrapped in
//! an `Arc` and handed to every dispatcher that should share them:
//!
//! ```
//! use herald_rate_limit::{GlobalLimiter, InvalidRequestTracker};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let limiter = Arc::new(GlobalLimiter::new(30, Duration::from_secs(1), Duration::from_millis(50)));
//! let invalid = Arc::new(InvalidRequestTracker::default());
//! // pass clones of both to each dispatcher that should share the budget
//! # let _ = (limiter, invalid);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod global;
mod invalid;

pub use global::{GlobalLimiter, LimiterSnapshot};
pub use invalid::{INVALID_REQUEST_WINDOW, InvalidRequestTracker, InvalidRequestWarning};
