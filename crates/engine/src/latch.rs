//! Level-triggered async signal
//!
//! The trigger edges and the event-arrival wakeup are latches, not queues:
//! `wait` returns immediately while the latch is set, and `set` wakes every
//! waiter. Waiters that register between the state store and the wakeup
//! re-check the flag, so no edge is lost.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct Latch {
    state: AtomicBool,
    notify: Notify,
}

impl Latch {
    pub fn new(set: bool) -> Self {
        Latch {
            state: AtomicBool::new(set),
            notify: Notify::new(),
        }
    }

    pub fn set(&self) {
        self.state.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn clear(&self) {
        self.state.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    /// Suspend until the latch is set. Returns immediately if it already is.
    pub async fn wait(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before the re-check so a concurrent set()
            // cannot slip between the check and the await.
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}
