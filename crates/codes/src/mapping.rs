//! Symbol → key code mapping
//!
//! Macro sources refer to keys by symbol: `KEY_A`, `a`, `BTN_LEFT`. The
//! [`SystemMapping`] resolves those symbols to kernel key codes. The default
//! table is built from the kernel name tables plus a lowercased, un-prefixed
//! alias per key (`"a"` for `KEY_A`), and the daemon can layer
//! layout-specific names on top with [`SystemMapping::insert`].

use crate::ecodes::KEY_CODES;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SystemMapping {
    table: HashMap<String, u16>,
}

impl Default for SystemMapping {
    fn default() -> Self {
        let mut table = HashMap::with_capacity(KEY_CODES.len() * 2);
        for (name, code) in KEY_CODES {
            table.insert((*name).to_string(), *code);
            if let Some(alias) = name.strip_prefix("KEY_") {
                // first name wins so aliases stay stable across table growth
                table
                    .entry(alias.to_lowercase())
                    .or_insert(*code);
            }
        }
        SystemMapping { table }
    }
}

impl SystemMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table, for callers that provide every symbol themselves.
    pub fn empty() -> Self {
        SystemMapping {
            table: HashMap::new(),
        }
    }

    /// Resolve a symbol to a key code.
    ///
    /// Tries the symbol as written, then case-folded variants, so `KEY_A`,
    /// `key_a` and `A` all resolve.
    pub fn get(&self, symbol: &str) -> Option<u16> {
        if let Some(code) = self.table.get(symbol) {
            return Some(*code);
        }
        if let Some(code) = self.table.get(symbol.to_uppercase().as_str()) {
            return Some(*code);
        }
        self.table.get(symbol.to_lowercase().as_str()).copied()
    }

    /// Add or override a symbol, e.g. layout names injected by the daemon.
    pub fn insert(&mut self, symbol: impl Into<String>, code: u16) {
        self.table.insert(symbol.into(), code);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
