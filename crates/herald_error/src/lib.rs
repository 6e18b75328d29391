//! Error types for the Herald dispatcher.
//!
//! This crate provides the foundation error types used throughout the Herald workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use herald_error::{HeraldResult, RestError, RestErrorKind};
//!
//! fn call() -> HeraldResult<serde_json::Value> {
//!     Err(RestError::new(RestErrorKind::Cancelled))?
//! }
//!
//! match call() {
//!     Ok(value) => println!("Got: {}", value),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod json;
mod rest;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use error::{HeraldError, HeraldErrorKind, HeraldResult};
pub use json::{JsonError, JsonErrorCategory};
pub use rest::{RequestContext, RestError, RestErrorKind, RestResult, RetryableError};
