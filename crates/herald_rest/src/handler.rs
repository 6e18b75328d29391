//! Sequential handler: one per routing key, driving the retry loop.
//!
//! Each logical request moves through the same states on every attempt:
//! admitted, waiting on the global limit, sending, classifying. The outcome
//! either ends the request or loops back to the global limit gate. The key
//! stays admitted for the whole loop, so retries never let a later request
//! overtake an earlier one.

use crate::classify::{FailureClass, ResponseClass, classify, classify_error, is_invalid_request};
use crate::context::DispatchContext;
use crate::events::{ApiRequest, RestEvent};
use crate::queue::{AdmissionQueue, Ticket};
use crate::resolve::TransportRequest;
use crate::response::ResponseEnvelope;
use herald_error::{RestError, RestErrorKind, RestResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Serializes requests for one routing key.
#[derive(Debug)]
pub struct SequentialHandler {
    id: String,
    queue: Arc<AdmissionQueue>,
    context: Arc<DispatchContext>,
}

impl SequentialHandler {
    pub(crate) fn new(id: impl Into<String>, context: Arc<DispatchContext>) -> Self {
        let id = id.into();
        debug!(key = %id, "Creating sequential handler");
        Self {
            id,
            queue: Arc::new(AdmissionQueue::new()),
            context,
        }
    }

    /// Routing key served by this handler.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when no request is admitted or waiting.
    pub fn inactive(&self) -> bool {
        self.queue.is_idle()
    }

    /// Requests admitted or waiting.
    pub fn remaining(&self) -> usize {
        self.queue.remaining()
    }

    /// Reserve the next place in this key's line.
    pub(crate) fn enqueue(&self) -> Ticket {
        self.queue.enqueue()
    }

    /// Wait for `ticket`'s turn, then run `request` to completion.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the final attempt, or
    /// [`RestErrorKind::Cancelled`] if `signal` fires at any suspension point.
    #[instrument(skip_all, fields(key = %self.id, route = %route))]
    pub(crate) async fn queue_request(
        &self,
        ticket: Ticket,
        request: &TransportRequest,
        route: &str,
        signal: Option<&CancellationToken>,
    ) -> RestResult<ResponseEnvelope> {
        let _admission = ticket
            .wait(signal)
            .await
            .map_err(|e| e.with_context(request.context().clone()))?;
        self.run_request(request, route, signal).await
    }

    fn failure(
        &self,
        kind: RestErrorKind,
        request: &TransportRequest,
        response: Option<&ResponseEnvelope>,
    ) -> RestError {
        let mut context = request.context().clone();
        context.response_body = response.map(|response| response.body().clone());
        RestError::new(kind).with_context(context)
    }

    async fn wait_for_global_limit(
        &self,
        request: &TransportRequest,
        signal: Option<&CancellationToken>,
    ) -> RestResult<()> {
        let limiter = &self.context.limiter;
        match signal {
            Some(signal) => {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => {
                        Err(self.failure(RestErrorKind::Cancelled, request, None))
                    }
                    _ = limiter.acquire() => Ok(()),
                }
            }
            None => {
                limiter.acquire().await;
                Ok(())
            }
        }
    }

    fn record_response(
        &self,
        request: &TransportRequest,
        route: &str,
        retries: u32,
        response: &ResponseEnvelope,
    ) {
        let context = &self.context;
        context.events.emit_with(|| RestEvent::Response {
            request: ApiRequest::new(
                request.context().method.clone(),
                request.context().url.clone(),
                route.to_string(),
                retries,
                request.context().body.clone(),
                request.context().files.clone(),
            ),
            response: response.clone(),
        });

        if is_invalid_request(*response.status()) {
            let interval = *context.options.invalid_request_warning_interval();
            if let Some(warning) = context.invalid_requests.record(interval) {
                context
                    .events
                    .emit(RestEvent::InvalidRequestWarning(warning));
            }
        }
    }

    async fn run_request(
        &self,
        request: &TransportRequest,
        route: &str,
        signal: Option<&CancellationToken>,
    ) -> RestResult<ResponseEnvelope> {
        let context = &self.context;
        let max_retries = *context.options.retries();
        let mut retries: u32 = 0;

        loop {
            self.wait_for_global_limit(request, signal).await?;

            let response = match context.executor.execute(request, signal).await {
                Ok(response) => response,
                Err(err) => {
                    let retryable = matches!(
                        classify_error(&err),
                        FailureClass::Transport { retryable: true }
                    );
                    if retryable && retries < max_retries {
                        retries += 1;
                        warn!(error = %err.kind(), retries, max_retries, "Transport failure, retrying");
                        continue;
                    }
                    if !err.is_cancelled() {
                        error!(error = %err.kind(), retries, "Transport failure");
                    }
                    return Err(err.with_context(request.context().clone()));
                }
            };
            self.record_response(request, route, retries, &response);

            match classify(&response) {
                ResponseClass::Success => {
                    debug!(status = response.status(), retries, "Request succeeded");
                    return Ok(response);
                }
                ResponseClass::RateLimited { retry_after } => {
                    context.limiter.penalize(retry_after);
                    context.events.debug(format!(
                        "Encountered unexpected 429 rate limit\n  Global         : {}\n  Method         : {}\n  URL            : {}\n  Retry After    : {}ms",
                        context.limiter.limited_for().is_some(),
                        request.method(),
                        request.redacted_url(),
                        retry_after.as_millis()
                    ));
                }
                ResponseClass::Server { status } => {
                    if retries < max_retries {
                        retries += 1;
                        warn!(status, retries, max_retries, "Server error, retrying");
                        continue;
                    }
                    error!(status, retries, "Server error, retries exhausted");
                    return Err(self.failure(
                        RestErrorKind::Server {
                            status,
                            status_text: response.status_text().clone(),
                        },
                        request,
                        Some(&response),
                    ));
                }
                ResponseClass::Client {
                    status,
                    code,
                    description,
                } => {
                    if status == 401 {
                        warn!("Unauthorized response, clearing default token");
                        context.token.set(None);
                    }
                    debug!(status, code, %description, "Request rejected by API");
                    return Err(self.failure(
                        RestErrorKind::Api {
                            status,
                            code,
                            description,
                        },
                        request,
                        Some(&response),
                    ));
                }
            }
        }
    }
}
