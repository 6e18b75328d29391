//! Herald - rate-limited dispatcher for bot HTTP JSON APIs
//!
//! Herald sends calls to a Telegram-style HTTP API while keeping the
//! process inside the API's limits:
//!
//! - **Per-key ordering**: requests sharing a routing key are sent one at a
//!   time in submission order
//! - **Global budget**: every key draws from one requests-per-window budget
//! - **Rate limit recovery**: a 429 stalls all keys for the advised delay and
//!   the request is retried
//! - **Bounded retries**: server errors, timeouts and dropped connections are
//!   retried up to the configured budget
//! - **Lifecycle events**: responses, handler sweeps and invalid request
//!   warnings are broadcast to subscribers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use herald::{HeraldConfig, RequestData, Rest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HeraldConfig::load()?;
//!     let rest = Rest::builder()
//!         .options(config.rest().clone())
//!         .token(std::env::var("HERALD_TOKEN")?)
//!         .build();
//!
//!     let me = rest.get("/getMe", RequestData::default()).await?;
//!     println!("{}", me);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `herald_error` - Error types
//! - `herald_rate_limit` - Global limiter and invalid request tracking
//! - `herald_rest` - Transport, classifier, key queues and the dispatcher
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod telemetry;

pub use telemetry::{init_tracing, init_tracing_with};

pub use herald_error::{
    BuilderError, BuilderErrorKind, ConfigError, HeraldError, HeraldErrorKind, HeraldResult,
    JsonError, RequestContext, RestError, RestErrorKind, RestResult, RetryableError,
};
pub use herald_rate_limit::{
    GlobalLimiter, INVALID_REQUEST_WINDOW, InvalidRequestTracker, InvalidRequestWarning,
    LimiterSnapshot,
};
pub use herald_rest::{
    ApiErrorData, ApiRequest, Classification, EventEmitter, FailureClass, FileData,
    GLOBAL_ROUTE_KEY, HandlerRegistry, HeraldConfig, RawFile, ReqwestTransport, RequestData,
    RequestDataBuilder, RequestDescriptor, RequestMethod, ResponseClass, ResponseEnvelope,
    ResponseParameters, Rest, RestBuilder, RestEvent, RestOptions, RestOptionsBuilder,
    SequentialHandler, Transport, TransportBody, TransportExecutor, TransportRequest, classify,
    classify_error, resolve_request,
};
