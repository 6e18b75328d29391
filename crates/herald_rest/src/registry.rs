//! Routing key to handler map, with periodic removal of idle handlers.

use crate::context::DispatchContext;
use crate::events::RestEvent;
use crate::handler::SequentialHandler;
use crate::queue::Ticket;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument, trace};

/// Owns one [`SequentialHandler`] per routing key.
#[derive(Debug)]
pub struct HandlerRegistry {
    handlers: Mutex<HashMap<String, Arc<SequentialHandler>>>,
    context: Arc<DispatchContext>,
}

impl HandlerRegistry {
    pub(crate) fn new(context: Arc<DispatchContext>) -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            context,
        }
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<String, Arc<SequentialHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry<'a>(
        &self,
        handlers: &'a mut HashMap<String, Arc<SequentialHandler>>,
        key: &str,
    ) -> &'a Arc<SequentialHandler> {
        handlers.entry(key.to_string()).or_insert_with(|| {
            Arc::new(SequentialHandler::new(key, Arc::clone(&self.context)))
        })
    }

    /// Handler for `key`, created on first use.
    pub fn get_or_create(&self, key: &str) -> Arc<SequentialHandler> {
        let mut handlers = self.handlers();
        Arc::clone(self.entry(&mut handlers, key))
    }

    /// Look up the handler for `key` and take a place in its line.
    ///
    /// Both happen under the registry lock, so a sweep can never remove the
    /// handler between lookup and enqueue.
    pub(crate) fn enqueue(&self, key: &str) -> (Arc<SequentialHandler>, Ticket) {
        let mut handlers = self.handlers();
        let handler = Arc::clone(self.entry(&mut handlers, key));
        let ticket = handler.enqueue();
        (handler, ticket)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers().len()
    }

    /// True when no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers().is_empty()
    }

    /// Whether a handler exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.handlers().contains_key(key)
    }

    /// Remove every inactive handler and report the removed keys.
    ///
    /// Emits one debug event per removed handler and a single
    /// [`RestEvent::HandlerSweep`] when anything was removed.
    #[instrument(skip(self))]
    pub fn sweep(&self) -> Vec<String> {
        let mut swept: Vec<String> = {
            let mut handlers = self.handlers();
            let idle: Vec<String> = handlers
                .iter()
                .filter(|(_, handler)| handler.inactive())
                .map(|(key, _)| key.clone())
                .collect();
            for key in &idle {
                handlers.remove(key);
            }
            idle
        };

        if swept.is_empty() {
            trace!("Sweep found no idle handlers");
            return swept;
        }

        swept.sort();
        for key in &swept {
            self.context
                .events
                .debug(format!("Handler {} swept due to being inactive", key));
        }
        debug!(count = swept.len(), "Swept idle handlers");
        self.context.events.emit(RestEvent::HandlerSweep {
            keys: swept.clone(),
        });
        swept
    }
}

/// Start sweeping `registry` every `interval`.
///
/// The task holds only a weak reference and exits once the registry is
/// dropped. Returns `None` outside a tokio runtime.
pub(crate) fn spawn_sweeper(
    registry: Weak<HandlerRegistry>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    debug!(interval_ms = interval.as_millis() as u64, "Starting handler sweeper");
    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(registry) = registry.upgrade() else {
                trace!("Registry dropped, stopping sweeper");
                break;
            };
            registry.sweep();
        }
    }))
}
