//! The dispatcher façade.

use crate::config::RestOptions;
use crate::context::{DispatchContext, TokenStore};
use crate::events::{EventEmitter, RestEvent};
use crate::handler::SequentialHandler;
use crate::queue::Ticket;
use crate::registry::{HandlerRegistry, spawn_sweeper};
use crate::request::{RequestData, RequestDescriptor, RequestMethod};
use crate::resolve::{TransportRequest, resolve_request};
use crate::response::ResponseEnvelope;
use crate::transport::{ReqwestTransport, Transport, TransportExecutor};
use herald_error::{HeraldResult, JsonError, RestError, RestErrorKind, RestResult};
use herald_rate_limit::{GlobalLimiter, InvalidRequestTracker};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span};

/// Rate-limited, order-preserving dispatcher for one API.
///
/// Requests take their place in their routing key's line when the verb
/// method is called, not when the returned future is first polled.
///
/// # Example
///
/// ```no_run
/// use herald_rest::{RequestData, Rest, RestOptions};
/// use serde_json::json;
///
/// # async fn run() -> Result<(), herald_error::RestError> {
/// let rest = Rest::new(RestOptions::default());
/// rest.set_token(Some("123456:ABC-DEF".to_string()));
///
/// let data = RequestData::builder()
///     .body(json!({"chat_id": 42, "text": "hello"}))
///     .build()
///     .expect("defaults");
/// let message = rest.post("/sendMessage", data).await?;
/// println!("{}", message["message_id"]);
/// # Ok(())
/// # }
/// ```
pub struct Rest {
    context: Arc<DispatchContext>,
    registry: Arc<HandlerRegistry>,
    sweeper: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Rest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rest")
            .field("options", &self.context.options)
            .field("handlers", &self.registry.len())
            .field("sweeping", &self.sweeper.is_some())
            .finish_non_exhaustive()
    }
}

impl Rest {
    /// Dispatcher with the default `reqwest` transport and private limiter state.
    pub fn new(options: RestOptions) -> Self {
        Self::builder().options(options).build()
    }

    /// Start configuring a dispatcher.
    pub fn builder() -> RestBuilder {
        RestBuilder::default()
    }

    /// Options in effect.
    pub fn options(&self) -> &RestOptions {
        &self.context.options
    }

    /// Replace the default credential; `None` clears it.
    ///
    /// Requests already resolved keep the credential they were resolved with.
    pub fn set_token(&self, token: Option<String>) {
        self.context.token.set(token);
    }

    /// Whether a default credential is set.
    pub fn has_token(&self) -> bool {
        self.context.token.get().is_some()
    }

    /// Listen for lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RestEvent> {
        self.context.events.subscribe()
    }

    /// Global limiter shared by every routing key.
    pub fn limiter(&self) -> &Arc<GlobalLimiter> {
        &self.context.limiter
    }

    /// Invalid request counter this dispatcher reports to.
    pub fn invalid_requests(&self) -> &Arc<InvalidRequestTracker> {
        &self.context.invalid_requests
    }

    /// Handler for `key`, created on first use.
    pub fn handler(&self, key: &str) -> Arc<SequentialHandler> {
        self.registry.get_or_create(key)
    }

    /// Registered routing keys.
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Remove idle handlers now instead of waiting for the timer.
    pub fn sweep_handlers(&self) -> Vec<String> {
        self.registry.sweep()
    }

    /// GET `route`.
    pub fn get(
        &self,
        route: impl Into<String>,
        data: RequestData,
    ) -> impl Future<Output = RestResult<Value>> + Send + 'static {
        self.request(RequestDescriptor::new(RequestMethod::Get, route, data))
    }

    /// POST `route`.
    pub fn post(
        &self,
        route: impl Into<String>,
        data: RequestData,
    ) -> impl Future<Output = RestResult<Value>> + Send + 'static {
        self.request(RequestDescriptor::new(RequestMethod::Post, route, data))
    }

    /// PUT `route`.
    pub fn put(
        &self,
        route: impl Into<String>,
        data: RequestData,
    ) -> impl Future<Output = RestResult<Value>> + Send + 'static {
        self.request(RequestDescriptor::new(RequestMethod::Put, route, data))
    }

    /// PATCH `route`.
    pub fn patch(
        &self,
        route: impl Into<String>,
        data: RequestData,
    ) -> impl Future<Output = RestResult<Value>> + Send + 'static {
        self.request(RequestDescriptor::new(RequestMethod::Patch, route, data))
    }

    /// DELETE `route`.
    pub fn delete(
        &self,
        route: impl Into<String>,
        data: RequestData,
    ) -> impl Future<Output = RestResult<Value>> + Send + 'static {
        self.request(RequestDescriptor::new(RequestMethod::Delete, route, data))
    }

    /// Dispatch `descriptor` and return the `result` field of the response.
    ///
    /// A response without `result` yields `Value::Null`.
    ///
    /// # Errors
    ///
    /// [`RestErrorKind::MissingToken`] when no credential is available,
    /// otherwise the classified failure of the final attempt.
    pub fn request(
        &self,
        descriptor: RequestDescriptor,
    ) -> impl Future<Output = RestResult<Value>> + Send + 'static {
        let response = self.queue_request(descriptor);
        async move { Ok(response.await?.into_result()) }
    }

    /// Dispatch `descriptor` and decode its `result` into `T`.
    ///
    /// # Errors
    ///
    /// Any [`request`](Self::request) failure, or a JSON error when the
    /// result does not match `T`.
    pub fn request_as<T>(
        &self,
        descriptor: RequestDescriptor,
    ) -> impl Future<Output = HeraldResult<T>> + Send + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let result = self.request(descriptor);
        async move {
            let value = result.await?;
            Ok(serde_json::from_value(value).map_err(JsonError::from)?)
        }
    }

    /// Dispatch `descriptor` and return the whole response.
    ///
    /// The credential is resolved and the request takes its place in line
    /// before this returns.
    pub fn queue_request(
        &self,
        descriptor: RequestDescriptor,
    ) -> impl Future<Output = RestResult<ResponseEnvelope>> + Send + 'static {
        let span = debug_span!(
            "rest_request",
            method = %descriptor.method(),
            route = %descriptor.route(),
            key = %descriptor.data().resolved_route_key(),
        );
        let submitted = span.in_scope(|| self.submit(&descriptor));

        async move {
            let (handler, ticket, request) = submitted?;
            let signal = descriptor.data().signal().clone();
            handler
                .queue_request(ticket, &request, descriptor.route(), signal.as_ref())
                .await
        }
        .instrument(span)
    }

    fn submit(
        &self,
        descriptor: &RequestDescriptor,
    ) -> RestResult<(Arc<SequentialHandler>, Ticket, TransportRequest)> {
        let data = descriptor.data();
        let token = data
            .token()
            .clone()
            .or_else(|| self.context.token.get())
            .ok_or_else(|| RestError::new(RestErrorKind::MissingToken))?;

        let request = resolve_request(&self.context.options, &token, descriptor)?;
        let (handler, ticket) = self.registry.enqueue(data.resolved_route_key());
        debug!(queued = handler.remaining(), "Request submitted");
        Ok((handler, ticket, request))
    }
}

impl Drop for Rest {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

/// Configures a [`Rest`] dispatcher.
///
/// Limiter and invalid request state are private to the dispatcher unless
/// shared explicitly by passing the same `Arc` to several builders.
#[derive(Default)]
pub struct RestBuilder {
    options: Option<RestOptions>,
    transport: Option<Arc<dyn Transport>>,
    limiter: Option<Arc<GlobalLimiter>>,
    invalid_requests: Option<Arc<InvalidRequestTracker>>,
    token: Option<String>,
}

impl RestBuilder {
    /// Dispatcher options; defaults when not set.
    pub fn options(mut self, options: RestOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Transport performing the HTTP calls.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Global limiter, possibly shared with other dispatchers.
    pub fn limiter(mut self, limiter: Arc<GlobalLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Invalid request counter, possibly shared with other dispatchers.
    pub fn invalid_requests(mut self, invalid_requests: Arc<InvalidRequestTracker>) -> Self {
        self.invalid_requests = Some(invalid_requests);
        self
    }

    /// Initial default credential.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the dispatcher.
    ///
    /// Starts the sweeper when a sweep interval is configured and a tokio
    /// runtime is running.
    pub fn build(self) -> Rest {
        let options = self.options.unwrap_or_default();
        let limiter = self.limiter.unwrap_or_else(|| {
            Arc::new(GlobalLimiter::new(
                *options.global_requests_per_second(),
                options.window(),
                options.offset(),
            ))
        });
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        let context = Arc::new(DispatchContext {
            limiter,
            invalid_requests: self.invalid_requests.unwrap_or_default(),
            executor: TransportExecutor::new(transport, options.timeout()),
            events: EventEmitter::new(*options.event_capacity()),
            token: TokenStore::new(self.token),
            options,
        });
        let registry = Arc::new(HandlerRegistry::new(Arc::clone(&context)));
        let sweeper = context
            .options
            .handler_sweep_interval()
            .and_then(|interval| spawn_sweeper(Arc::downgrade(&registry), interval));

        debug!(sweeping = sweeper.is_some(), "Dispatcher ready");
        Rest {
            context,
            registry,
            sweeper,
        }
    }
}
