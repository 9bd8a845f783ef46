//! Engine error taxonomy
//!
//! Parse- and build-time failures are fatal for the macro that raised them;
//! runtime failures abort the current run and are logged with the macro's
//! source text. Handler write failures are not retried here: the enclosing
//! injector owns the virtual device and restarts it.

use std::fmt;

/// Failure to write an event to the virtual output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectError {
    message: String,
}

impl InjectError {
    pub fn new(message: impl Into<String>) -> Self {
        InjectError {
            message: message.into(),
        }
    }
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "injection failed: {}", self.message)
    }
}

impl std::error::Error for InjectError {}

impl From<std::io::Error> for InjectError {
    fn from(err: std::io::Error) -> Self {
        InjectError::new(err.to_string())
    }
}

/// Everything that can go wrong while parsing, building or running a macro.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroError {
    /// Malformed expression or illegal variable name
    Syntax(String),
    /// An argument of the wrong kind (and not a late-bound variable)
    Type {
        op: String,
        position: usize,
        message: String,
    },
    /// Key symbol not present in the system mapping
    UnknownKey(String),
    /// Unresolved event type or code in `e(...)`
    UnknownEvent(String),
    /// A variable resolved to an incompatible or missing value mid-run
    Runtime(String),
    /// The handler refused an event write
    Inject(InjectError),
}

impl MacroError {
    pub(crate) fn type_error(
        op: &str,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        MacroError::Type {
            op: op.to_string(),
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for MacroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroError::Syntax(message) => write!(f, "syntax error: {message}"),
            MacroError::Type {
                op,
                position,
                message,
            } => write!(f, "parameter {position} of {op}: {message}"),
            MacroError::UnknownKey(symbol) => write!(f, "unknown key \"{symbol}\""),
            MacroError::UnknownEvent(name) => write!(f, "unknown event \"{name}\""),
            MacroError::Runtime(message) => write!(f, "{message}"),
            MacroError::Inject(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MacroError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MacroError::Inject(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InjectError> for MacroError {
    fn from(err: InjectError) -> Self {
        MacroError::Inject(err)
    }
}
