//! Macro argument values and build-time validation
//!
//! Arguments in a macro expression are either literals or `$name` references
//! whose value is unknown until the step runs. Builders validate what they
//! can at build time with [`validate`]; a [`Value::Variable`] passes through
//! untouched and is narrowed again after resolution (see
//! [`crate::variables::VariableStore::resolve`]).

use crate::error::MacroError;
use keyloom_codes::SystemMapping;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A literal or late-bound macro argument.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    /// Reference to the variable store, parsed from `$name`
    Variable(String),
}

impl Value {
    pub fn is_variable(&self) -> bool {
        matches!(self, Value::Variable(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Variable(_) => "variable",
        }
    }
}

// Equality follows the comparison semantics of `if_eq`: integers and floats
// compare numerically, strings by content, and a still-unresolved variable
// only equals the same reference.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Variable(a), Value::Variable(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Variable(name) => write!(f, "${name}"),
        }
    }
}

/// Argument kinds a builder may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Int,
    Float,
    Text,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Int => write!(f, "int"),
            Kind::Float => write!(f, "float"),
            Kind::Text => write!(f, "string"),
        }
    }
}

/// Constructive coercion of a literal into one kind.
///
/// Mirrors what builders accept: `"10"` parses as 10, a float truncates to
/// int, numbers format as text. Returns `None` when the literal cannot
/// become that kind.
fn coerce(value: &Value, kind: Kind) -> Option<Value> {
    match (kind, value) {
        (Kind::Int, Value::Int(_)) => Some(value.clone()),
        (Kind::Int, Value::Float(x)) => Some(Value::Int(*x as i64)),
        (Kind::Int, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::Int),
        (Kind::Float, Value::Float(_)) => Some(value.clone()),
        (Kind::Float, Value::Int(n)) => Some(Value::Float(*n as f64)),
        (Kind::Float, Value::Text(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
        (Kind::Text, Value::Text(_)) => Some(value.clone()),
        (Kind::Text, Value::Int(n)) => Some(Value::Text(n.to_string())),
        (Kind::Text, Value::Float(x)) => Some(Value::Text(x.to_string())),
        (_, Value::Variable(_)) => None,
    }
}

fn expected_kinds(allowed: &[Kind]) -> String {
    let names: Vec<String> = allowed.iter().map(Kind::to_string).collect();
    names.join(" or ")
}

/// Validate one argument against the kinds an operation accepts.
///
/// Variables pass through unchanged and are narrowed at runtime. For
/// literals, the kinds are tried in order with constructive coercion; the
/// first match wins.
pub fn validate(
    value: &Value,
    allowed: &[Kind],
    op: &str,
    position: usize,
) -> Result<Value, MacroError> {
    if value.is_variable() {
        return Ok(value.clone());
    }

    for kind in allowed {
        if let Some(coerced) = coerce(value, *kind) {
            return Ok(coerced);
        }
    }

    Err(MacroError::type_error(
        op,
        position,
        format!("expected {}, got \"{value}\"", expected_kinds(allowed)),
    ))
}

/// Resolve a key symbol through the system mapping.
///
/// Key symbols must be known when the macro is built so that the virtual
/// device can declare them; a `$variable` here is rejected.
pub fn validate_keyname(
    symbol: &Value,
    mapping: &SystemMapping,
    op: &str,
    position: usize,
) -> Result<u16, MacroError> {
    let name = match symbol {
        Value::Text(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Variable(_) => {
            return Err(MacroError::type_error(
                op,
                position,
                "key symbols must be literal, not a $variable",
            ));
        }
    };

    mapping.get(&name).ok_or(MacroError::UnknownKey(name))
}

fn variable_name_pattern() -> &'static Regex {
    static VARIABLE_NAME: OnceLock<Regex> = OnceLock::new();
    VARIABLE_NAME
        .get_or_init(|| Regex::new("^[A-Za-z_][A-Za-z_0-9]*$").expect("hardcoded pattern compiles"))
}

/// Check that a name is usable as a variable without clashing with the
/// expression grammar.
///
/// Allowed: `foo`, `Foo1234_`, `_foo_1234`. Not allowed: `1_foo`, `foo=bar`,
/// `$foo`, `foo()`.
pub fn validate_variable_name(name: &str) -> Result<(), MacroError> {
    if variable_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(MacroError::Syntax(format!(
            "\"{name}\" is not a legit variable name"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_passes_through() {
        let var = Value::Variable("speed".to_string());
        let out = validate(&var, &[Kind::Int], "mouse", 2).unwrap();
        assert_eq!(out, var);
    }

    #[test]
    fn test_string_parses_as_int() {
        let out = validate(&Value::Text("10".to_string()), &[Kind::Int], "w (wait)", 1).unwrap();
        assert_eq!(out, Value::Int(10));
    }

    #[test]
    fn test_float_truncates_when_int_tried_first() {
        let out = validate(
            &Value::Float(1.5),
            &[Kind::Int, Kind::Float],
            "w (wait)",
            1,
        )
        .unwrap();
        assert_eq!(out, Value::Int(1));
    }

    #[test]
    fn test_string_falls_through_to_float() {
        let out = validate(
            &Value::Text("1.5".to_string()),
            &[Kind::Int, Kind::Float],
            "w (wait)",
            1,
        )
        .unwrap();
        assert_eq!(out, Value::Float(1.5));
    }

    #[test]
    fn test_number_formats_as_text() {
        let out = validate(&Value::Int(5), &[Kind::Text], "ifeq", 1).unwrap();
        assert_eq!(out, Value::Text("5".to_string()));
    }

    #[test]
    fn test_mismatch_names_op_and_position() {
        let err = validate(
            &Value::Text("fast".to_string()),
            &[Kind::Int],
            "r (repeat)",
            1,
        )
        .unwrap_err();
        match err {
            MacroError::Type { op, position, .. } => {
                assert_eq!(op, "r (repeat)");
                assert_eq!(position, 1);
            }
            other => panic!("expected type error, got {other:?}"),
        }
    }

    #[test]
    fn test_keyname_resolution() {
        let mapping = SystemMapping::default();
        let code = validate_keyname(&Value::Text("KEY_A".to_string()), &mapping, "k (key)", 1)
            .unwrap();
        assert_eq!(code, keyloom_codes::KEY_A);

        let err = validate_keyname(&Value::Text("KEY_NOPE".to_string()), &mapping, "k (key)", 1)
            .unwrap_err();
        assert_eq!(err, MacroError::UnknownKey("KEY_NOPE".to_string()));
    }

    #[test]
    fn test_keyname_rejects_variables() {
        let mapping = SystemMapping::default();
        let err = validate_keyname(
            &Value::Variable("key".to_string()),
            &mapping,
            "h (hold)",
            1,
        )
        .unwrap_err();
        assert!(matches!(err, MacroError::Type { .. }));
    }

    #[test]
    fn test_variable_names() {
        assert!(validate_variable_name("foo").is_ok());
        assert!(validate_variable_name("Foo1234_").is_ok());
        assert!(validate_variable_name("_foo_1234").is_ok());
        assert!(validate_variable_name("1_foo").is_err());
        assert!(validate_variable_name("foo=bar").is_err());
        assert!(validate_variable_name("$foo").is_err());
        assert!(validate_variable_name("").is_err());
    }

    #[test]
    fn test_numeric_equality_crosses_int_and_float() {
        assert_eq!(Value::Int(5), Value::Float(5.0));
        assert_ne!(Value::Int(5), Value::Text("5".to_string()));
    }
}
