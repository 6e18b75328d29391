//! Scripted transport for testing.

use async_trait::async_trait;
use herald_error::{RestError, RestErrorKind, RestResult};
use herald_rest::{ResponseEnvelope, Transport, TransportBody, TransportRequest};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// A single scripted outcome.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Respond with a status and JSON body
    Json { status: u16, body: Value },
    /// Fail without a response
    TransportError { message: String, retryable: bool },
    /// Never respond
    Hang,
}

impl MockResponse {
    /// `{"ok": true, "result": result}` with status 200.
    pub fn ok(result: Value) -> Self {
        Self::Json {
            status: 200,
            body: json!({"ok": true, "result": result}),
        }
    }

    /// API error payload with the given status.
    pub fn api_error(status: u16, description: &str) -> Self {
        Self::Json {
            status,
            body: json!({"ok": false, "error_code": status, "description": description}),
        }
    }

    /// 429 advising a wait of `retry_after_ms`.
    pub fn rate_limited(retry_after_ms: u64) -> Self {
        Self::Json {
            status: 429,
            body: json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests",
                "parameters": {"retry_after": retry_after_ms}
            }),
        }
    }

    /// Bare status with an empty body.
    pub fn status(status: u16) -> Self {
        Self::Json {
            status,
            body: Value::Null,
        }
    }

    /// Retryable connection reset.
    pub fn reset() -> Self {
        Self::TransportError {
            message: "connection reset by peer".to_string(),
            retryable: true,
        }
    }
}

/// Behavior configuration for mock responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return the same response
    Always(MockResponse),
    /// Return responses in order, then repeat the fallback
    Sequence {
        responses: Vec<MockResponse>,
        fallback: MockResponse,
    },
}

/// One request the transport saw.
#[derive(Debug, Clone)]
pub struct SentRequest {
    /// When it was sent
    pub at: Instant,
    /// Method
    pub method: String,
    /// Full URL, credential included
    pub url: String,
    /// JSON body, if the body was JSON
    pub body: Option<Value>,
    /// The request as resolved
    pub request: TransportRequest,
}

/// Mock transport for testing.
///
/// Records every call and answers from a script, optionally after a delay.
pub struct MockTransport {
    script: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    latency: Duration,
    sent: Mutex<Vec<SentRequest>>,
}

impl MockTransport {
    /// Transport that answers every call with `200 {"ok": true, "result": true}`.
    pub fn new_success() -> Arc<Self> {
        Self::new_with_behavior(MockBehavior::Always(MockResponse::ok(json!(true))))
    }

    /// Transport that answers every call with `response`.
    pub fn new_always(response: MockResponse) -> Arc<Self> {
        Self::new_with_behavior(MockBehavior::Always(response))
    }

    /// Transport answering with `responses`, then succeeding forever.
    pub fn new_sequence(responses: Vec<MockResponse>) -> Arc<Self> {
        Self::new_with_behavior(MockBehavior::Sequence {
            responses,
            fallback: MockResponse::ok(json!(true)),
        })
    }

    /// Transport with custom behavior.
    pub fn new_with_behavior(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self::build(behavior, Duration::ZERO))
    }

    /// Like [`new_with_behavior`](Self::new_with_behavior), but every call
    /// takes `latency` before answering.
    #[allow(dead_code)]
    pub fn with_latency(behavior: MockBehavior, latency: Duration) -> Arc<Self> {
        Arc::new(Self::build(behavior, latency))
    }

    fn build(behavior: MockBehavior, latency: Duration) -> Self {
        let (script, fallback) = match behavior {
            MockBehavior::Always(response) => (VecDeque::new(), response),
            MockBehavior::Sequence {
                responses,
                fallback,
            } => (responses.into(), fallback),
        };
        Self {
            script: Mutex::new(script),
            fallback,
            latency,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Every call made, in order.
    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Send instants, in order.
    #[allow(dead_code)]
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent().into_iter().map(|sent| sent.at).collect()
    }

    fn next_response(&self) -> MockResponse {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &TransportRequest) -> RestResult<ResponseEnvelope> {
        let body = match request.body() {
            TransportBody::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
            _ => None,
        };
        self.sent.lock().unwrap().push(SentRequest {
            at: Instant::now(),
            method: request.method().to_string(),
            url: request.url().to_string(),
            body,
            request: request.clone(),
        });

        let response = self.next_response();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match response {
            MockResponse::Json { status, body } => Ok(ResponseEnvelope::new(status, body)),
            MockResponse::TransportError { message, retryable } => {
                Err(RestError::new(RestErrorKind::Transport { message, retryable }))
            }
            MockResponse::Hang => std::future::pending().await,
        }
    }
}
