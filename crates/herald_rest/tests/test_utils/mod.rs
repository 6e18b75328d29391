//! Test utilities for Herald dispatcher tests.
//!
//! This module provides a scripted transport and dispatcher helpers.

use herald_rest::{RequestData, Rest, RestOptions};
use std::sync::Arc;

pub mod mock_transport;

#[allow(unused_imports)]
pub use mock_transport::{MockBehavior, MockResponse, MockTransport, SentRequest};

/// Token every test dispatcher starts with.
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "123456:TEST-TOKEN";

/// Options with sweeping disabled and the given budget per one-second window.
#[allow(dead_code)]
pub fn test_options(budget: u32) -> RestOptions {
    RestOptions::builder()
        .global_requests_per_second(budget)
        .window_ms(1_000u64)
        .offset_ms(50u64)
        .handler_sweep_interval_ms(0u64)
        .build()
        .expect("Failed to build test options")
}

/// Dispatcher over `transport` with a default token.
#[allow(dead_code)]
pub fn mock_rest(transport: Arc<MockTransport>, options: RestOptions) -> Rest {
    Rest::builder()
        .options(options)
        .transport(transport)
        .token(TEST_TOKEN)
        .build()
}

/// Request data carrying a JSON body.
#[allow(dead_code)]
pub fn json_data(body: serde_json::Value) -> RequestData {
    RequestData::builder()
        .body(body)
        .build()
        .expect("Failed to build request data")
}

/// Request data routed under `key`.
#[allow(dead_code)]
pub fn keyed(key: &str) -> RequestData {
    RequestData::builder()
        .route_key(key)
        .build()
        .expect("Failed to build request data")
}

/// Request data routed under `key` and carrying a JSON body.
#[allow(dead_code)]
pub fn keyed_json(key: &str, body: serde_json::Value) -> RequestData {
    RequestData::builder()
        .route_key(key)
        .body(body)
        .build()
        .expect("Failed to build request data")
}

/// Request data cancelled by `signal`.
#[allow(dead_code)]
pub fn cancellable(signal: &tokio_util::sync::CancellationToken) -> RequestData {
    RequestData::builder()
        .signal(signal.clone())
        .build()
        .expect("Failed to build request data")
}
