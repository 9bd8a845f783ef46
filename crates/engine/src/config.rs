//! Injection preset configuration
//!
//! The engine reads exactly one knob from the preset: the keystroke pause.
//! The daemon deserializes the full preset file and hands this slice to the
//! engine through [`crate::context::Context`].

use serde::{Deserialize, Serialize};

/// Default pause between adjacent key events, in milliseconds. Some
/// downstream software drops keystrokes that arrive back to back.
pub const DEFAULT_KEYSTROKE_SLEEP_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Pause inserted between adjacent key events, in milliseconds
    pub keystroke_sleep_ms: u64,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        InjectionConfig {
            keystroke_sleep_ms: DEFAULT_KEYSTROKE_SLEEP_MS,
        }
    }
}

impl InjectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keystroke_sleep_ms(mut self, ms: u64) -> Self {
        self.keystroke_sleep_ms = ms;
        self
    }

    /// Parse a preset fragment, e.g. `keystroke_sleep_ms = 25`.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}
