//! Pure classification of attempt outcomes.
//!
//! A received response and a transport failure are judged by separate
//! functions with separate verdict types, so a response can never be read
//! as a cancellation and a failure can never be read as a success.

use crate::response::ResponseEnvelope;
use herald_error::{RestError, RestErrorKind, RestResult};
use std::time::Duration;

/// What the retry loop should do with a received response.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display, strum::EnumIs)]
pub enum ResponseClass {
    /// Below 400: hand the response to the caller
    Success,
    /// 5xx: counted retry
    Server {
        /// HTTP status
        status: u16,
    },
    /// 429: uncounted retry after a global stall
    RateLimited {
        /// Advisory delay from the response body
        retry_after: Duration,
    },
    /// Any other 4xx: fatal
    Client {
        /// HTTP status
        status: u16,
        /// API `error_code`, falling back to the HTTP status
        code: i64,
        /// API `description`, falling back to the reason phrase
        description: String,
    },
}

/// What the retry loop should do when no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIs)]
pub enum FailureClass {
    /// The caller cancelled; never retried
    Cancelled,
    /// Network-level failure
    Transport {
        /// Whether the failure may clear up on retry
        retryable: bool,
    },
}

/// Verdict on either outcome of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, strum::EnumIs)]
pub enum Classification {
    /// A response arrived
    Response(ResponseClass),
    /// No response arrived
    Failure(FailureClass),
}

/// Statuses counted toward the process-wide invalid request tally.
pub fn is_invalid_request(status: u16) -> bool {
    matches!(status, 401 | 403 | 429)
}

/// Classify a received response.
///
/// Statuses below 400 (including redirects the transport did not follow)
/// are successes.
pub fn classify(response: &ResponseEnvelope) -> ResponseClass {
    let status = *response.status();
    if response.is_success() {
        return ResponseClass::Success;
    }
    if status == 429 {
        return ResponseClass::RateLimited {
            retry_after: response.error_data().retry_after(),
        };
    }
    if status >= 500 {
        return ResponseClass::Server { status };
    }

    let data = response.error_data();
    ResponseClass::Client {
        status,
        code: data.error_code().unwrap_or(i64::from(status)),
        description: data
            .description()
            .clone()
            .unwrap_or_else(|| response.status_text().clone()),
    }
}

/// Classify a transport failure.
pub fn classify_error(error: &RestError) -> FailureClass {
    match error.kind() {
        RestErrorKind::Cancelled => FailureClass::Cancelled,
        RestErrorKind::Transport { retryable, .. } => FailureClass::Transport {
            retryable: *retryable,
        },
        _ => FailureClass::Transport { retryable: false },
    }
}

/// Classify either outcome of an attempt.
pub fn classify_outcome(outcome: &RestResult<ResponseEnvelope>) -> Classification {
    match outcome {
        Ok(response) => Classification::Response(classify(response)),
        Err(error) => Classification::Failure(classify_error(error)),
    }
}
