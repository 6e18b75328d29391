//! Single HTTP attempts: the pluggable transport and its timeout/cancellation wrapper.

use crate::resolve::{FormPart, TransportBody, TransportRequest};
use crate::response::ResponseEnvelope;
use async_trait::async_trait;
use herald_error::{RestError, RestErrorKind, RestResult};
use serde_json::Value;
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Performs one HTTP call.
///
/// Implementations return a [`ResponseEnvelope`] for every response the
/// server sent, whatever its status, and a [`RestErrorKind::Transport`] error
/// when no response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response.
    async fn send(&self, request: &TransportRequest) -> RestResult<ResponseEnvelope>;
}

/// Default [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport around an existing client, e.g. one with a proxy configured.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn form(parts: &[FormPart]) -> RestResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    field,
                    file_name,
                    content_type,
                    data,
                } => {
                    let file = reqwest::multipart::Part::bytes(data.clone())
                        .file_name(file_name.clone())
                        .mime_str(content_type)
                        .map_err(|e| {
                            RestError::new(RestErrorKind::Encoding(format!(
                                "Invalid content type '{}' for {}: {}",
                                content_type, file_name, e
                            )))
                        })?;
                    form.part(field.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Whether an I/O failure somewhere in the error chain means the connection dropped.
fn is_connection_drop(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        let text = current.to_string().to_ascii_lowercase();
        if text.contains("connection reset")
            || text.contains("broken pipe")
            || text.contains("unexpected eof")
            || text.contains("connection closed before message completed")
        {
            return true;
        }
        source = current.source();
    }
    false
}

/// Map a `reqwest` failure to a transport error.
///
/// Timeouts and dropped connections are retryable. DNS, TLS, refused
/// connections and request construction errors are not.
fn transport_error(err: reqwest::Error) -> RestError {
    let retryable = err.is_timeout() || (!err.is_builder() && is_connection_drop(&err));
    RestError::new(RestErrorKind::Transport {
        message: err.to_string(),
        retryable,
    })
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> RestResult<ResponseEnvelope> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());

        builder = match request.body() {
            TransportBody::Empty => builder,
            TransportBody::Bytes(bytes) => builder.body(bytes.clone()),
            TransportBody::Multipart(parts) => builder.multipart(Self::form(parts)?),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(transport_error)?;

        Ok(ResponseEnvelope::new(status.as_u16(), decode_body(&bytes))
            .with_status_text(status.canonical_reason().unwrap_or_default())
            .with_headers(headers))
    }
}

/// Runs one transport attempt under a timeout and an optional cancellation signal.
#[derive(Clone)]
pub struct TransportExecutor {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl std::fmt::Debug for TransportExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportExecutor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TransportExecutor {
    /// Wrap `transport` with a per-attempt `timeout`.
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one attempt.
    ///
    /// An already-cancelled signal fails immediately without touching the
    /// transport. A timeout yields a retryable transport error; cancellation
    /// yields [`RestErrorKind::Cancelled`].
    #[instrument(skip_all, fields(method = %request.method(), url = %request.redacted_url()))]
    pub async fn execute(
        &self,
        request: &TransportRequest,
        signal: Option<&CancellationToken>,
    ) -> RestResult<ResponseEnvelope> {
        let attempt = tokio::time::timeout(self.timeout, self.transport.send(request));

        let outcome = match signal {
            Some(signal) if signal.is_cancelled() => {
                debug!("Signal already cancelled, not sending");
                return Err(RestError::new(RestErrorKind::Cancelled));
            }
            Some(signal) => {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => {
                        debug!("Request cancelled in flight");
                        return Err(RestError::new(RestErrorKind::Cancelled));
                    }
                    outcome = attempt => outcome,
                }
            }
            None => attempt.await,
        };

        outcome.unwrap_or_else(|_| {
            debug!(timeout_ms = self.timeout.as_millis() as u64, "Request timed out");
            Err(RestError::new(RestErrorKind::Transport {
                message: format!("request timed out after {}ms", self.timeout.as_millis()),
                retryable: true,
            }))
        })
    }
}
