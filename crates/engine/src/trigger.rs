//! Trigger edge state
//!
//! Two complementary latches mirror the physical state of the trigger key.
//! Exactly one of them is set at any time: `released` from construction
//! until the first press, then they toggle on every edge. Release is
//! idempotent; the redundant-press check lives in
//! [`crate::macros::Macro::press_trigger`] where the source text is
//! available for the log line.

use crate::latch::Latch;

#[derive(Debug)]
pub struct TriggerState {
    pressed: Latch,
    released: Latch,
}

impl TriggerState {
    pub fn new() -> Self {
        TriggerState {
            pressed: Latch::new(false),
            released: Latch::new(true),
        }
    }

    pub fn press(&self) {
        self.released.clear();
        self.pressed.set();
    }

    pub fn release(&self) {
        self.released.set();
        self.pressed.clear();
    }

    /// True between a press edge and the matching release edge.
    pub fn is_holding(&self) -> bool {
        !self.released.is_set()
    }

    pub async fn wait_pressed(&self) {
        self.pressed.wait().await;
    }

    pub async fn wait_released(&self) {
        self.released.wait().await;
    }
}

impl Default for TriggerState {
    fn default() -> Self {
        Self::new()
    }
}
