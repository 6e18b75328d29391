//! Dispatcher error taxonomy.
//!
//! Every logical request either yields a parsed result or exactly one
//! [`RestError`]. The [`RestErrorKind`] tells callers which part of the
//! pipeline gave up:
//!
//! - [`RestErrorKind::MissingToken`]: no credential could be resolved; raised
//!   before the request is queued and never retried.
//! - [`RestErrorKind::Transport`]: the network call itself failed; retried up
//!   to the configured budget when `retryable` is set.
//! - [`RestErrorKind::Server`]: a 5xx response outlived the retry budget.
//! - [`RestErrorKind::Api`]: any other 4xx; surfaced immediately.
//! - [`RestErrorKind::Cancelled`]: the caller's cancellation token fired.
//!
//! Rate-limit (429) responses are absorbed by the retry loop and never appear
//! here.

use std::fmt;

/// Specific dispatcher error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RestErrorKind {
    /// No per-request token and no default token.
    #[display("Expected token to be set for this request, but none was present")]
    MissingToken,

    /// Route rejected before the request was built.
    #[display("Invalid route '{}': {}", route, reason)]
    InvalidRoute {
        /// The offending route
        route: String,
        /// Why it was rejected
        reason: String,
    },

    /// Request body could not be encoded.
    #[display("Failed to encode request body: {}", _0)]
    Encoding(String),

    /// Network-level failure (timeout, reset, DNS, TLS...).
    #[display("Transport failure: {}", message)]
    Transport {
        /// Underlying error message
        message: String,
        /// Whether another attempt may succeed
        retryable: bool,
    },

    /// 5xx response after the retry budget was spent.
    #[display("Server responded {} {}", status, status_text)]
    Server {
        /// HTTP status code
        status: u16,
        /// HTTP reason phrase
        status_text: String,
    },

    /// Non-retryable 4xx response carrying the API's error payload.
    #[display("API error {} (HTTP {}): {}", code, status, description)]
    Api {
        /// HTTP status code
        status: u16,
        /// `error_code` reported by the API, or the HTTP status when absent
        code: i64,
        /// `description` reported by the API
        description: String,
    },

    /// The caller cancelled the request.
    #[display("Request was cancelled")]
    Cancelled,
}

/// Diagnostics attached to a failed request.
///
/// The URL is always redacted: the credential segment is replaced before the
/// context is built, so errors can be logged verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// HTTP method of the failed request
    pub method: String,
    /// Fully resolved URL with the credential redacted
    pub url: String,
    /// JSON body submitted by the caller, if any
    pub body: Option<serde_json::Value>,
    /// Names of attached files, in submission order
    pub files: Vec<String>,
    /// Body of the last response received, if any
    pub response_body: Option<serde_json::Value>,
}

/// Dispatcher error with kind discrimination and location tracking.
///
/// # Examples
///
/// ```
/// use herald_error::{RestError, RestErrorKind, RetryableError};
///
/// let err = RestError::new(RestErrorKind::Server {
///     status: 503,
///     status_text: "Service Unavailable".to_string(),
/// });
/// assert_eq!(err.status(), Some(503));
/// assert!(err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Error)]
pub struct RestError {
    /// The specific error kind
    pub kind: RestErrorKind,
    /// Request diagnostics, when the request got far enough to be resolved
    pub context: Option<RequestContext>,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl RestError {
    /// Create a new dispatcher error with location tracking.
    #[track_caller]
    pub fn new(kind: RestErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            context: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Attach request diagnostics.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RestErrorKind {
        &self.kind
    }

    /// HTTP status of the response that caused this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            RestErrorKind::Server { status, .. } | RestErrorKind::Api { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// True when the caller's cancellation token ended the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, RestErrorKind::Cancelled)
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REST Error: {}", self.kind)?;
        if let Some(context) = &self.context {
            write!(f, " [{} {}]", context.method, context.url)?;
        }
        write!(f, " at line {} in {}", self.line, self.file)
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use herald_error::{RestError, RestErrorKind, RetryableError};
///
/// let reset = RestError::new(RestErrorKind::Transport {
///     message: "connection reset by peer".to_string(),
///     retryable: true,
/// });
/// assert!(reset.is_retryable());
///
/// let rejected = RestError::new(RestErrorKind::Api {
///     status: 400,
///     code: 400,
///     description: "Bad Request: chat not found".to_string(),
/// });
/// assert!(!rejected.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should consume a counted retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for RestErrorKind {
    fn is_retryable(&self) -> bool {
        match self {
            RestErrorKind::Transport { retryable, .. } => *retryable,
            RestErrorKind::Server { .. } => true,
            _ => false,
        }
    }
}

impl RetryableError for RestError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Result type for dispatcher operations.
pub type RestResult<T> = Result<T, RestError>;
