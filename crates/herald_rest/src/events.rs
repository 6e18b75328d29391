//! Lifecycle events published to listeners.

use crate::response::ResponseEnvelope;
use derive_getters::Getters;
use herald_rate_limit::InvalidRequestWarning;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

/// Metadata about the attempt that produced a response.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct ApiRequest {
    /// HTTP method
    method: String,
    /// Resolved URL with the credential redacted
    url: String,
    /// Route as submitted
    route: String,
    /// Counted retries made before this attempt
    retries: u32,
    /// JSON body submitted by the caller
    body: Option<Value>,
    /// Names of attached files
    files: Vec<String>,
}

impl ApiRequest {
    pub(crate) fn new(
        method: String,
        url: String,
        route: String,
        retries: u32,
        body: Option<Value>,
        files: Vec<String>,
    ) -> Self {
        Self {
            method,
            url,
            route,
            retries,
            body,
            files,
        }
    }
}

/// Events emitted by a [`Rest`](crate::Rest) dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum RestEvent {
    /// Free-form diagnostic message
    Debug(String),
    /// A response was received for one attempt
    Response {
        /// The attempt
        request: ApiRequest,
        /// What came back
        response: ResponseEnvelope,
    },
    /// Idle routing keys were removed
    HandlerSweep {
        /// Keys of the removed queues
        keys: Vec<String>,
    },
    /// The invalid request count reached a multiple of the warning interval
    InvalidRequestWarning(InvalidRequestWarning),
}

/// Broadcasts [`RestEvent`]s to every subscriber.
///
/// Sending with no subscribers is a no-op; debug messages are always logged.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<RestEvent>,
}

impl EventEmitter {
    /// Emitter buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<RestEvent> {
        self.sender.subscribe()
    }

    /// Whether anyone is listening.
    pub fn has_listeners(&self) -> bool {
        self.sender.receiver_count() > 0
    }

    /// Publish `event` if anyone is listening.
    pub fn emit(&self, event: RestEvent) {
        if self.has_listeners() {
            // Receivers may drop between the check and the send.
            let _ = self.sender.send(event);
        }
    }

    /// Build and publish an event only when someone is listening.
    pub fn emit_with(&self, event: impl FnOnce() -> RestEvent) {
        if self.has_listeners() {
            self.emit(event());
        }
    }

    /// Log `message` and publish it as [`RestEvent::Debug`].
    pub fn debug(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "herald_rest::events", "{}", message);
        self.emit(RestEvent::Debug(message));
    }
}
