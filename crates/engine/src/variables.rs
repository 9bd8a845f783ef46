//! Process-wide variable store
//!
//! One store is shared by every macro in the process through cloned handles
//! hanging off [`crate::context::Context`]. Mutation is point-wise: last
//! writer wins, readers see whole values. Values live for the process
//! lifetime; nothing is persisted.

use crate::error::MacroError;
use crate::value::{validate, Kind, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Cheaply clonable handle to the shared `name → Value` map.
#[derive(Clone, Default)]
pub struct VariableStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one variable. Unset names return `None`.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner
            .read()
            .expect("variable store lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.inner
            .write()
            .expect("variable store lock poisoned")
            .insert(name.into(), value);
    }

    /// Resolve an argument just in time, without narrowing.
    ///
    /// Literals come back as-is; a variable reference is looked up and
    /// returns `None` when unset.
    pub fn resolve_raw(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Variable(name) => {
                let resolved = self.get(name);
                match &resolved {
                    Some(found) => debug!(name, value = %found, "resolved variable"),
                    None => debug!(name, "variable is not set"),
                }
                resolved
            }
            literal => Some(literal.clone()),
        }
    }

    /// Resolve an argument and narrow it to the kinds the step accepts.
    ///
    /// An unset variable, or one holding an incompatible value, is a runtime
    /// error: the owning step aborts and the run terminates.
    pub fn resolve(
        &self,
        value: &Value,
        allowed: &[Kind],
        op: &str,
        position: usize,
    ) -> Result<Value, MacroError> {
        let resolved = match value {
            Value::Variable(name) => self.resolve_raw(value).ok_or_else(|| {
                MacroError::Runtime(format!("variable \"{name}\" is not set"))
            })?,
            literal => literal.clone(),
        };

        validate(&resolved, allowed, op, position).map_err(|err| match err {
            MacroError::Type { op, message, .. } => {
                MacroError::Runtime(format!("{op}: {message}"))
            }
            other => other,
        })
    }
}

impl fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().expect("variable store lock poisoned");
        f.debug_struct("VariableStore")
            .field("len", &inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let store = VariableStore::new();
        assert_eq!(store.get("x"), None);
        store.set("x", Value::Int(5));
        assert_eq!(store.get("x"), Some(Value::Int(5)));
    }

    #[test]
    fn test_last_writer_wins() {
        let store = VariableStore::new();
        let other = store.clone();
        store.set("x", Value::Int(1));
        other.set("x", Value::Int(2));
        assert_eq!(store.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn test_resolve_literal_is_identity() {
        let store = VariableStore::new();
        let out = store
            .resolve(&Value::Int(3), &[Kind::Int], "r (repeat)", 1)
            .unwrap();
        assert_eq!(out, Value::Int(3));
    }

    #[test]
    fn test_resolve_narrows_stored_string() {
        let store = VariableStore::new();
        store.set("n", Value::Text("4".to_string()));
        let out = store
            .resolve(
                &Value::Variable("n".to_string()),
                &[Kind::Int],
                "r (repeat)",
                1,
            )
            .unwrap();
        assert_eq!(out, Value::Int(4));
    }

    #[test]
    fn test_resolve_unset_is_runtime_error() {
        let store = VariableStore::new();
        let err = store
            .resolve(
                &Value::Variable("ghost".to_string()),
                &[Kind::Int],
                "w (wait)",
                1,
            )
            .unwrap_err();
        assert!(matches!(err, MacroError::Runtime(_)));
    }

    #[test]
    fn test_resolve_incompatible_is_runtime_error() {
        let store = VariableStore::new();
        store.set("n", Value::Text("fast".to_string()));
        let err = store
            .resolve(
                &Value::Variable("n".to_string()),
                &[Kind::Int],
                "mouse",
                2,
            )
            .unwrap_err();
        assert!(matches!(err, MacroError::Runtime(_)));
    }

    #[test]
    fn test_resolve_raw_unset_is_none() {
        let store = VariableStore::new();
        assert_eq!(store.resolve_raw(&Value::Variable("ghost".to_string())), None);
        assert_eq!(
            store.resolve_raw(&Value::Int(1)),
            Some(Value::Int(1))
        );
    }
}
