//! Shared engine inputs
//!
//! A [`Context`] bundles what every macro needs from its surroundings: the
//! injection preset, the process-wide variable store and the key symbol
//! table. Handles are cheap to clone; every macro in a tree carries one.

use crate::config::InjectionConfig;
use crate::variables::VariableStore;
use keyloom_codes::SystemMapping;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct Context {
    variables: VariableStore,
    mapping: Arc<SystemMapping>,
    config: Arc<RwLock<InjectionConfig>>,
}

impl Context {
    pub fn new(config: InjectionConfig, mapping: SystemMapping) -> Self {
        Context {
            variables: VariableStore::new(),
            mapping: Arc::new(mapping),
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn mapping(&self) -> &SystemMapping {
        &self.mapping
    }

    /// Snapshot of the keystroke pause. Read once per run so a preset
    /// update cannot change timing mid-macro.
    pub fn keystroke_sleep_ms(&self) -> u64 {
        self.config
            .read()
            .expect("config lock poisoned")
            .keystroke_sleep_ms
    }

    /// Swap in a new preset; running macros keep the values they started
    /// with, the next run picks these up.
    pub fn set_config(&self, config: InjectionConfig) {
        *self.config.write().expect("config lock poisoned") = config;
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(InjectionConfig::default(), SystemMapping::default())
    }
}
