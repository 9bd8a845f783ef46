//! Keyloom Engine: the macro execution engine
//!
//! Given a macro expression bound to a physical trigger key, the engine
//! injects a time-ordered stream of synthetic input events through a
//! [`EventHandler`], reacting in real time to trigger press/release edges
//! and to other concurrent key activity.
//!
//! The engine deliberately knows nothing about devices: the surrounding
//! daemon grabs hardware, owns the evdev read loop and the virtual output
//! device, and feeds this crate through three narrow surfaces - the
//! [`Context`] inputs (preset, variable store, key symbol table), the
//! notification methods on [`Macro`], and the handler it passes to
//! [`Macro::run`].
//!
//! ```no_run
//! use keyloom_engine::{parse, Context, EventHandler, InjectError};
//!
//! struct Uinput;
//!
//! impl EventHandler for Uinput {
//!     fn write(&self, kind: u16, code: u16, value: i32) -> Result<(), InjectError> {
//!         // write to the virtual device here
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), keyloom_engine::MacroError> {
//! let ctx = Context::default();
//! let mac = parse("r(3, k(KEY_A).w(10))", &ctx)?;
//! mac.run(&Uinput).await;
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
pub mod config;
pub mod context;
pub mod error;
pub mod macros;
pub mod parser;
pub mod value;
pub mod variables;

mod latch;
mod observer;
mod steps;
mod trigger;

pub use capabilities::Capabilities;
pub use config::InjectionConfig;
pub use context::Context;
pub use error::{InjectError, MacroError};
pub use macros::{EventHandler, Macro};
pub use observer::Action;
pub use parser::parse;
pub use value::{Kind, Value};
pub use variables::VariableStore;
