//! State shared by a dispatcher and all of its handlers.

use crate::config::RestOptions;
use crate::events::EventEmitter;
use crate::transport::TransportExecutor;
use herald_rate_limit::{GlobalLimiter, InvalidRequestTracker};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Process-wide default credential.
#[derive(Debug, Default)]
pub(crate) struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub(crate) fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set(&self, token: Option<String>) {
        debug!(present = token.is_some(), "Default token replaced");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

/// Everything a handler needs to run requests.
///
/// Handlers hold this instead of a reference to the dispatcher, so the
/// registry owning the handlers never forms a cycle with them.
#[derive(Debug)]
pub(crate) struct DispatchContext {
    pub(crate) options: RestOptions,
    pub(crate) limiter: Arc<GlobalLimiter>,
    pub(crate) invalid_requests: Arc<InvalidRequestTracker>,
    pub(crate) executor: TransportExecutor,
    pub(crate) events: EventEmitter,
    pub(crate) token: TokenStore,
}
