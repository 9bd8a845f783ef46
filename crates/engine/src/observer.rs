//! Rolling latest-event slot
//!
//! `if_single` needs to know what the injector saw most recently: the slot
//! holds the newest `(event, action)` pair and a wakeup latch. Only the
//! newest pair is kept; a step that suspends across two arrivals observes
//! the second one, which is exactly the semantics `if_single` wants.

use crate::latch::Latch;
use keyloom_codes::InputEvent;
use std::sync::Mutex;

/// How a hardware event relates to a mapped input, as classified by the
/// surrounding event loop. Only compared for equality here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A key or button went down
    Press,
    /// An axis crossed its threshold in the negative direction
    PressNegative,
    /// A key or button came back up
    Release,
}

#[derive(Debug, Default)]
pub struct EventObserver {
    arrived: Latch,
    newest: Mutex<Option<(InputEvent, Action)>>,
}

impl EventObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the newest event and wake anyone waiting on arrival.
    pub fn notify(&self, event: InputEvent, action: Action) {
        *self.newest.lock().expect("event slot lock poisoned") = Some((event, action));
        self.arrived.set();
    }

    /// Drop any wakeup that predates the current run.
    pub fn clear_arrived(&self) {
        self.arrived.clear();
    }

    pub fn latest(&self) -> Option<(InputEvent, Action)> {
        *self.newest.lock().expect("event slot lock poisoned")
    }

    /// Suspend until an event arrives that the filter accepts.
    pub async fn wait_matching(&self, mut filter: impl FnMut(&InputEvent, Action) -> bool) {
        loop {
            self.arrived.wait().await;
            self.arrived.clear();

            if let Some((event, action)) = self.latest() {
                if filter(&event, action) {
                    return;
                }
            }
        }
    }
}
