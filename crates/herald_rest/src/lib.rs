//! Rate-limited, order-preserving dispatcher for bot HTTP JSON APIs.
//!
//! A [`Rest`] dispatcher accepts API calls from any number of concurrent
//! callers and:
//!
//! - serializes requests per routing key in submission order
//! - keeps every key under one global requests-per-window budget
//! - retries server and transport failures up to a bounded budget
//! - absorbs 429 responses by stalling all keys for the advised delay
//! - surfaces everything else as a typed [`RestError`](herald_error::RestError)
//!
//! # Example
//!
//! ```no_run
//! use herald_rest::{RequestData, Rest, RestOptions};
//!
//! # async fn run() -> Result<(), herald_error::RestError> {
//! let rest = Rest::builder()
//!     .options(RestOptions::default())
//!     .token("123456:ABC-DEF")
//!     .build();
//!
//! let me = rest.get("/getMe", RequestData::default()).await?;
//! println!("{}", me["username"]);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod config;
mod context;
mod events;
mod handler;
mod queue;
mod registry;
mod request;
mod resolve;
mod response;
mod rest;
mod sniff;
mod transport;

pub use classify::{
    Classification, FailureClass, ResponseClass, classify, classify_error, classify_outcome,
    is_invalid_request,
};
pub use config::{HeraldConfig, RestOptions, RestOptionsBuilder};
pub use events::{ApiRequest, EventEmitter, RestEvent};
pub use handler::SequentialHandler;
pub use queue::{AdmissionGuard, AdmissionQueue, Ticket};
pub use registry::HandlerRegistry;
pub use request::{
    FileData, GLOBAL_ROUTE_KEY, RawFile, RequestData, RequestDataBuilder, RequestDescriptor,
    RequestMethod,
};
pub use resolve::{FormPart, REDACTED, TransportBody, TransportRequest, resolve_request};
pub use response::{ApiErrorData, ResponseEnvelope, ResponseParameters};
pub use rest::{Rest, RestBuilder};
pub use sniff::{OCTET_STREAM, content_type_or_default, sniff_content_type};
pub use transport::{ReqwestTransport, Transport, TransportExecutor};
