//! Per-key FIFO admission.
//!
//! A request takes its place in line when it is enqueued, which happens
//! synchronously at submission, so the order of `enqueue` calls is the order
//! of admission. At most one [`AdmissionGuard`] exists per queue at a time.
//! Dropping the guard hands admission straight to the next live waiter.

use herald_error::{RestError, RestErrorKind, RestResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Default)]
struct QueueState {
    busy: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// FIFO admission queue for one routing key.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    state: Mutex<QueueState>,
}

impl AdmissionQueue {
    /// Empty, idle queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a place in line.
    pub fn enqueue(self: &Arc<Self>) -> Ticket {
        let mut state = self.state();
        let slot = if state.busy {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            trace!(waiting = state.waiters.len(), "Request queued behind admitted request");
            Slot::Waiting(receiver)
        } else {
            state.busy = true;
            Slot::Admitted
        };
        Ticket {
            queue: Arc::clone(self),
            slot,
        }
    }

    fn release(&self) {
        let mut state = self.state();
        while let Some(next) = state.waiters.pop_front() {
            if next.send(()).is_ok() {
                trace!("Admission handed to next waiter");
                return;
            }
        }
        state.busy = false;
        trace!("Queue drained");
    }

    /// Requests admitted or still waiting.
    pub fn remaining(&self) -> usize {
        let state = self.state();
        let waiting = state.waiters.iter().filter(|w| !w.is_closed()).count();
        waiting + usize::from(state.busy)
    }

    /// True when nothing is admitted and nothing is waiting.
    pub fn is_idle(&self) -> bool {
        !self.state().busy
    }
}

#[derive(Debug)]
enum Slot {
    Admitted,
    Waiting(oneshot::Receiver<()>),
    Spent,
}

/// A place in an [`AdmissionQueue`].
///
/// Dropping an unredeemed ticket gives up the place without disturbing
/// anyone behind it.
#[derive(Debug)]
pub struct Ticket {
    queue: Arc<AdmissionQueue>,
    slot: Slot,
}

impl Ticket {
    /// Wait for admission.
    ///
    /// # Errors
    ///
    /// Returns [`RestErrorKind::Cancelled`] if `signal` fires first.
    pub async fn wait(mut self, signal: Option<&CancellationToken>) -> RestResult<AdmissionGuard> {
        let queue = Arc::clone(&self.queue);
        match std::mem::replace(&mut self.slot, Slot::Spent) {
            Slot::Admitted | Slot::Spent => Ok(AdmissionGuard { queue }),
            Slot::Waiting(mut receiver) => {
                let admitted = match signal {
                    Some(signal) => tokio::select! {
                        biased;
                        admitted = &mut receiver => Some(admitted),
                        _ = signal.cancelled() => None,
                    },
                    None => Some((&mut receiver).await),
                };
                match admitted {
                    Some(Ok(())) => Ok(AdmissionGuard { queue }),
                    Some(Err(_)) => Err(RestError::new(RestErrorKind::Cancelled)),
                    None => {
                        trace!("Cancelled while waiting for admission");
                        self.slot = Slot::Waiting(receiver);
                        Err(RestError::new(RestErrorKind::Cancelled))
                    }
                }
            }
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.slot, Slot::Spent) {
            Slot::Admitted => self.queue.release(),
            Slot::Waiting(mut receiver) => {
                receiver.close();
                // Admission may have been handed over just before closing.
                if receiver.try_recv().is_ok() {
                    self.queue.release();
                }
            }
            Slot::Spent => {}
        }
    }
}

/// Exclusive admission for one key; released on drop.
#[derive(Debug)]
pub struct AdmissionGuard {
    queue: Arc<AdmissionQueue>,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.queue.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_ticket_admitted_immediately() {
        let queue = Arc::new(AdmissionQueue::new());
        let guard = queue.enqueue().wait(None).await.expect("admitted");
        assert!(!queue.is_idle());
        assert_eq!(queue.remaining(), 1);

        drop(guard);
        assert!(queue.is_idle());
        assert_eq!(queue.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_follows_enqueue_order() {
        let queue = Arc::new(AdmissionQueue::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = queue.enqueue();
        let tickets: Vec<_> = (0..5).map(|_| queue.enqueue()).collect();

        // Spawn in reverse so task scheduling order cannot explain the result.
        let mut handles = Vec::new();
        for (index, ticket) in tickets.into_iter().enumerate().rev() {
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _guard = ticket.wait(None).await.expect("admitted");
                order.lock().expect("lock").push(index);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }));
        }

        let guard = first.wait(None).await.expect("admitted");
        tokio::time::sleep(Duration::from_millis(5)).await;
        drop(guard);

        for handle in handles {
            handle.await.expect("task completes");
        }
        assert_eq!(*order.lock().expect("lock"), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_idle());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_skipped() {
        let queue = Arc::new(AdmissionQueue::new());
        let guard = queue.enqueue().wait(None).await.expect("admitted");

        let cancelled = queue.enqueue();
        let next = queue.enqueue();

        let signal = CancellationToken::new();
        signal.cancel();
        let err = cancelled.wait(Some(&signal)).await.expect_err("cancelled");
        assert!(err.is_cancelled());
        assert_eq!(queue.remaining(), 2);

        drop(guard);
        let _next_guard = next.wait(None).await.expect("admitted after skip");
        assert_eq!(queue.remaining(), 1);
    }

    #[tokio::test]
    async fn test_dropped_ticket_after_handoff_releases() {
        let queue = Arc::new(AdmissionQueue::new());
        let guard = queue.enqueue().wait(None).await.expect("admitted");
        let abandoned = queue.enqueue();
        let last = queue.enqueue();

        // Admission is handed to `abandoned`, which never redeems it.
        drop(guard);
        drop(abandoned);

        let _guard = last.wait(None).await.expect("admission passed along");
    }
}
