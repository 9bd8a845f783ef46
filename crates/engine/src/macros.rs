//! The macro tree: builders and the cooperative runtime
//!
//! A [`Macro`] holds an ordered sequence of compiled steps plus the child
//! macros those steps run. Building it (through the parser or the `add_*`
//! methods directly) validates every argument that is not late-bound and
//! accumulates the capability set the virtual device must expose. Running
//! it walks the steps in order on one cooperative task, suspending on
//! timers and trigger edges.
//!
//! ```text
//! r(3, k(a).w(10)):                            a <10ms> a <10ms> a <10ms>
//! w(1000).m(KEY_LEFTSHIFT, r(2, k(a))).k(b):   <1s> A A b
//! ```

use crate::capabilities::Capabilities;
use crate::context::Context;
use crate::error::{InjectError, MacroError};
use crate::observer::{Action, EventObserver};
use crate::steps::{ChildId, Step};
use crate::trigger::TriggerState;
use crate::value::{validate, validate_keyname, validate_variable_name, Kind, Value};
use crate::variables::VariableStore;
use keyloom_codes::{
    code_by_name, event_type_by_name, InputEvent, EV_KEY, EV_REL, REL_HWHEEL, REL_WHEEL, REL_X,
    REL_Y,
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::error;

/// Writes one synthetic input event to the virtual output device.
///
/// Implementations serialize their own writes; the engine only calls this
/// from within the macro's task. Failures are not retried here - the
/// enclosing injector owns device recovery.
pub trait EventHandler: Send + Sync {
    fn write(&self, kind: u16, code: u16, value: i32) -> Result<(), InjectError>;
}

/// Per-run values read once at `run` start, so a preset change cannot
/// shift timing mid-macro.
pub(crate) struct RunParams {
    pub keystroke_sleep: Duration,
}

pub struct Macro {
    source: String,
    context: Context,
    steps: Vec<Step>,
    pub(crate) children: Vec<Macro>,
    capabilities: Capabilities,
    pub(crate) trigger: TriggerState,
    pub(crate) observer: EventObserver,
    running: AtomicBool,
}

/// Clears the running flag on every exit path, cancellation included.
struct ClearOnDrop<'a>(&'a AtomicBool);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Macro {
    pub fn new(source: impl Into<String>, context: Context) -> Self {
        Macro {
            source: source.into(),
            context,
            steps: Vec::new(),
            children: Vec::new(),
            capabilities: Capabilities::new(),
            trigger: TriggerState::new(),
            observer: EventObserver::new(),
            running: AtomicBool::new(false),
        }
    }

    /// The original expression, kept for diagnostics.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn variables(&self) -> &VariableStore {
        self.context.variables()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True while the trigger key is physically held down.
    pub fn is_holding(&self) -> bool {
        self.trigger.is_holding()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn child(&self, id: ChildId) -> &Macro {
        &self.children[id]
    }

    fn adopt(&mut self, child: Macro) -> ChildId {
        self.children.push(child);
        self.children.len() - 1
    }

    /// The merged capability set of this macro and all descendants.
    pub fn capabilities(&self) -> Capabilities {
        let mut merged = self.capabilities.clone();
        for child in &self.children {
            merged.merge(&child.capabilities());
        }
        merged
    }

    // ------------------------------------------------------------------
    // Notifications from the surrounding event loop
    // ------------------------------------------------------------------

    /// The user pressed the trigger key down.
    pub fn press_trigger(&self) {
        if self.is_holding() {
            error!(source = self.source.as_str(), "already holding");
            return;
        }

        self.trigger.press();
        for child in &self.children {
            child.press_trigger();
        }
    }

    /// The user released the trigger key.
    pub fn release_trigger(&self) {
        self.trigger.release();
        for child in &self.children {
            child.release_trigger();
        }
    }

    /// Tell the macro tree about the newest hardware event.
    pub fn notify(&self, event: InputEvent, action: Action) {
        for child in &self.children {
            child.notify(event, action);
        }
        self.observer.notify(event, action);
    }

    // ------------------------------------------------------------------
    // Runtime
    // ------------------------------------------------------------------

    /// Run the compiled steps in order.
    ///
    /// A macro never runs concurrently with itself: re-entry while a run is
    /// live is logged and ignored. A failing step is logged with the source
    /// text and aborts the remaining steps.
    pub fn run<'a>(
        &'a self,
        handler: &'a dyn EventHandler,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if self.running.swap(true, Ordering::SeqCst) {
                error!(
                    source = self.source.as_str(),
                    "tried to run an already running macro"
                );
                return;
            }
            let _running = ClearOnDrop(&self.running);

            // wakeups that predate this run are stale
            self.observer.clear_arrived();

            let params = RunParams {
                keystroke_sleep: Duration::from_millis(self.context.keystroke_sleep_ms()),
            };

            for step in &self.steps {
                if let Err(err) = step.run(self, &params, handler).await {
                    error!(source = self.source.as_str(), %err, "macro failed");
                    break;
                }
            }
        })
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// `k(symbol)`: one keystroke.
    pub fn add_key(&mut self, symbol: Value) -> Result<(), MacroError> {
        let code = validate_keyname(&symbol, self.context.mapping(), "k (key)", 1)?;
        self.capabilities.add(EV_KEY, code);
        self.steps.push(Step::Key { code });
        Ok(())
    }

    /// `w(ms)`: sleep.
    pub fn add_wait(&mut self, duration_ms: Value) -> Result<(), MacroError> {
        let duration_ms = validate(&duration_ms, &[Kind::Int, Kind::Float], "w (wait)", 1)?;
        self.steps.push(Step::Wait { duration_ms });
        Ok(())
    }

    /// `r(n, child)`: run the child to completion n times.
    pub fn add_repeat(&mut self, count: Value, child: Macro) -> Result<(), MacroError> {
        let count = validate(&count, &[Kind::Int], "r (repeat)", 1)?;
        let child = self.adopt(child);
        self.steps.push(Step::Repeat { count, child });
        Ok(())
    }

    /// `h()`: block until the trigger releases.
    pub fn add_hold(&mut self) {
        self.steps.push(Step::Hold);
    }

    /// `h(symbol)`: hold a key down for as long as the trigger is held.
    pub fn add_hold_key(&mut self, symbol: Value) -> Result<(), MacroError> {
        let code = validate_keyname(&symbol, self.context.mapping(), "h (hold)", 1)?;
        self.capabilities.add(EV_KEY, code);
        self.steps.push(Step::HoldKey { code });
        Ok(())
    }

    /// `h(child)`: rerun the child while the trigger is held.
    pub fn add_hold_macro(&mut self, child: Macro) {
        let child = self.adopt(child);
        self.steps.push(Step::HoldMacro { child });
    }

    /// `m(symbol, child)`: run the child inside a modifier press.
    pub fn add_modify(&mut self, modifier: Value, child: Macro) -> Result<(), MacroError> {
        let code = validate_keyname(&modifier, self.context.mapping(), "m (modify)", 1)?;
        self.capabilities.add(EV_KEY, code);
        let child = self.adopt(child);
        self.steps.push(Step::Modify { code, child });
        Ok(())
    }

    /// `mouse(direction, speed)`: continuous pointer motion while held.
    pub fn add_mouse(&mut self, direction: Value, speed: Value) -> Result<(), MacroError> {
        let (axis, sign) = Self::direction(
            &validate(&direction, &[Kind::Text], "mouse", 1)?,
            "mouse",
            &[
                ("up", (REL_Y, -1)),
                ("down", (REL_Y, 1)),
                ("left", (REL_X, -1)),
                ("right", (REL_X, 1)),
            ],
        )?;
        let speed = validate(&speed, &[Kind::Int], "mouse", 2)?;
        self.capabilities.add_pointer_footprint();
        self.steps.push(Step::Mouse { axis, sign, speed });
        Ok(())
    }

    /// `wheel(direction, speed)`: continuous scroll while held.
    pub fn add_wheel(&mut self, direction: Value, speed: Value) -> Result<(), MacroError> {
        let (code, sign) = Self::direction(
            &validate(&direction, &[Kind::Text], "wheel", 1)?,
            "wheel",
            &[
                ("up", (REL_WHEEL, 1)),
                ("down", (REL_WHEEL, -1)),
                ("left", (REL_HWHEEL, 1)),
                ("right", (REL_HWHEEL, -1)),
            ],
        )?;
        let speed = validate(&speed, &[Kind::Int], "wheel", 2)?;
        if let Value::Int(0) = speed {
            return Err(MacroError::type_error(
                "wheel",
                2,
                "speed must not be zero",
            ));
        }
        self.capabilities.add_pointer_footprint();
        self.steps.push(Step::Wheel { code, sign, speed });
        Ok(())
    }

    fn direction(
        value: &Value,
        op: &str,
        table: &[(&str, (u16, i32))],
    ) -> Result<(u16, i32), MacroError> {
        let name = match value {
            Value::Text(s) => s.to_lowercase(),
            _ => {
                return Err(MacroError::type_error(
                    op,
                    1,
                    "directions must be literal, not a $variable",
                ));
            }
        };
        table
            .iter()
            .find(|(direction, _)| *direction == name)
            .map(|(_, target)| *target)
            .ok_or_else(|| {
                MacroError::type_error(op, 1, format!("unknown direction \"{name}\""))
            })
    }

    /// `e(type, code, value)`: one raw event; type and code may be symbolic.
    pub fn add_event(&mut self, kind: Value, code: Value, value: Value) -> Result<(), MacroError> {
        let kind = validate(&kind, &[Kind::Int, Kind::Text], "e (event)", 1)?;
        let code = validate(&code, &[Kind::Int, Kind::Text], "e (event)", 2)?;
        let value = validate(&value, &[Kind::Int], "e (event)", 3)?;

        let kind = Self::event_field(&kind, event_type_by_name, "e (event)", 1)?;
        let code = Self::event_field(&code, code_by_name, "e (event)", 2)?;

        if kind == EV_REL {
            // any relative event means the device must look like a pointer
            self.capabilities.add_pointer_footprint();
        }
        self.capabilities.add(kind, code);
        self.steps.push(Step::Event { kind, code, value });
        Ok(())
    }

    fn event_field(
        value: &Value,
        lookup: fn(&str) -> Option<u16>,
        op: &str,
        position: usize,
    ) -> Result<u16, MacroError> {
        match value {
            Value::Int(n) => {
                u16::try_from(*n).map_err(|_| MacroError::UnknownEvent(n.to_string()))
            }
            Value::Text(s) => lookup(s).ok_or_else(|| MacroError::UnknownEvent(s.clone())),
            Value::Float(_) | Value::Variable(_) => Err(MacroError::type_error(
                op,
                position,
                "event types and codes must be literal",
            )),
        }
    }

    /// `set(name, value)`: assign into the variable store.
    pub fn add_set(&mut self, name: Value, value: Value) -> Result<(), MacroError> {
        let name = match name {
            Value::Text(s) => s,
            other => {
                return Err(MacroError::Syntax(format!(
                    "\"{other}\" is not a legit variable name"
                )));
            }
        };
        validate_variable_name(&name)?;
        self.steps.push(Step::Set { name, value });
        Ok(())
    }

    /// `if_eq(v1, v2, then, else)`: compare two resolved values.
    pub fn add_if_eq(
        &mut self,
        lhs: Value,
        rhs: Value,
        then: Option<Macro>,
        otherwise: Option<Macro>,
    ) {
        let then = then.map(|child| self.adopt(child));
        let otherwise = otherwise.map(|child| self.adopt(child));
        self.steps.push(Step::IfEq {
            lhs,
            rhs,
            then,
            otherwise,
        });
    }

    /// `ifeq(name, value, then, else)`: legacy comparison.
    ///
    /// The first argument is always treated as a variable name, even when
    /// it looks like a literal, and the comparison value is used raw. Old
    /// presets depend on both quirks.
    pub fn add_ifeq(
        &mut self,
        name: Value,
        rhs: Value,
        then: Option<Macro>,
        otherwise: Option<Macro>,
    ) -> Result<(), MacroError> {
        let name = match validate(&name, &[Kind::Text], "ifeq", 1)? {
            Value::Text(s) => s,
            _ => {
                return Err(MacroError::type_error(
                    "ifeq",
                    1,
                    "variable names must be literal",
                ));
            }
        };
        let then = then.map(|child| self.adopt(child));
        let otherwise = otherwise.map(|child| self.adopt(child));
        self.steps.push(Step::IfVarEq {
            name,
            rhs,
            then,
            otherwise,
        });
        Ok(())
    }

    /// `if_tap(then, else, timeout_ms)`: branch on a quick press+release.
    pub fn add_if_tap(
        &mut self,
        then: Option<Macro>,
        otherwise: Option<Macro>,
        timeout_ms: Option<Value>,
    ) -> Result<(), MacroError> {
        let timeout_ms = match timeout_ms {
            Some(timeout_ms) => validate(&timeout_ms, &[Kind::Int, Kind::Float], "if_tap", 3)?,
            None => Value::Int(300),
        };
        let then = then.map(|child| self.adopt(child));
        let otherwise = otherwise.map(|child| self.adopt(child));
        self.steps.push(Step::IfTap {
            then,
            otherwise,
            timeout_ms,
        });
        Ok(())
    }

    /// `if_single(then, else, timeout_ms)`: branch on whether the trigger
    /// was released without any other key being pressed in between.
    pub fn add_if_single(
        &mut self,
        then: Option<Macro>,
        otherwise: Option<Macro>,
        timeout_ms: Option<Value>,
    ) -> Result<(), MacroError> {
        let timeout_ms = match timeout_ms {
            Some(timeout_ms) => Some(validate(
                &timeout_ms,
                &[Kind::Int, Kind::Float],
                "if_single",
                3,
            )?),
            None => None,
        };
        let then = then.map(|child| self.adopt(child));
        let otherwise = otherwise.map(|child| self.adopt(child));
        self.steps.push(Step::IfSingle {
            then,
            otherwise,
            timeout_ms,
        });
        Ok(())
    }
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Macro")
            .field("source", &self.source)
            .field("steps", &self.steps.len())
            .field("children", &self.children.len())
            .field("running", &self.is_running())
            .finish()
    }
}
