//! Observable holder of a [`FutureValue`].

use std::sync::Arc;
use tokio::sync::watch;

use super::value::{FutureKind, FutureValue};
use super::FutureError;

/// Settable cell that publishes every [`FutureValue`] transition to subscribers.
///
/// This is cheaply cloneable; clones share the same state.
pub struct FutureCell<V> {
    tx: Arc<watch::Sender<FutureValue<V>>>,
}

impl<V> Clone for FutureCell<V> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<V> Default for FutureCell<V> {
    fn default() -> Self {
        Self::new(FutureValue::Pending { added_at: None })
    }
}

impl<V> FutureCell<V> {
    pub fn new(initial: FutureValue<V>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current kind without cloning the payload.
    pub fn kind(&self) -> FutureKind {
        self.tx.borrow().kind()
    }

    /// Moves to `next`.
    ///
    /// Skipping forward is allowed (`Pending` straight to `Finished`), going back
    /// or re-entering a stage is not.
    pub fn set(&self, next: FutureValue<V>) -> Result<(), FutureError> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|current| {
            let from = current.kind();
            let to = next.kind();
            if to.stage() <= from.stage() {
                outcome = Err(FutureError::IllegalTransition { from, to });
                return false;
            }
            *current = next;
            true
        });
        if let Err(ref e) = outcome {
            tracing::warn!("Rejected future transition: {}", e);
        }
        outcome
    }

    /// Replaces the state unconditionally, starting a new lifecycle.
    pub fn reset(&self, value: FutureValue<V>) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<FutureValue<V>> {
        self.tx.subscribe()
    }
}

impl<V: Clone> FutureCell<V> {
    /// Clone of the current state.
    pub fn snapshot(&self) -> FutureValue<V> {
        self.tx.borrow().clone()
    }

    /// The value if the cell is currently `Finished`.
    pub fn finished_value(&self) -> Option<V> {
        self.tx.borrow().finished_value().cloned()
    }

    /// Waits until the cell reaches a terminal state and returns it.
    pub async fn wait_ended(&self) -> FutureValue<V> {
        let mut rx = self.tx.subscribe();
        let ended = match rx.wait_for(|v| v.is_ended()).await {
            Ok(value) => value.clone(),
            // The sender lives in `self`, so the channel cannot close while we wait.
            Err(_) => self.snapshot(),
        };
        ended
    }
}
