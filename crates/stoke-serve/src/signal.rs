//! Single-fire readiness signal.
//!
//! A [`ReadinessSignal`] goes from pending to resolved exactly once and never
//! resets. Any number of tasks can wait on it; once resolved, every current
//! and future waiter gets the value immediately.

use std::fmt;
use tokio::sync::watch;

pub struct ReadinessSignal<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> ReadinessSignal<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Resolve the signal with `value`.
    ///
    /// Returns `false` (and drops `value`) if the signal was already
    /// resolved; the first value always wins.
    pub fn resolve(&self, value: T) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The value, if already resolved.
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Wait until the signal resolves.
    ///
    /// Pending forever if it never does.
    pub async fn wait(&self) -> T {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(value) = rx.borrow_and_update().clone() {
                return value;
            }
            // The sender lives in `self`, so `changed` only fails if the
            // signal is being torn down underneath us.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl<T: Clone> Default for ReadinessSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ReadinessSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.tx.borrow().is_some() {
            "resolved"
        } else {
            "pending"
        };
        f.debug_struct("ReadinessSignal")
            .field("state", &state)
            .finish()
    }
}
