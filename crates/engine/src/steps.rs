//! Compiled macro steps
//!
//! Builders on [`Macro`] validate their arguments, grow the capability set
//! and append one `Step`. A step is immutable once compiled; at run time it
//! executes against the owning macro's trigger state and the injection
//! handler. Steps that press a key release it on every exit path, including
//! cancellation: the down/up pairing is guarded by [`ReleaseGuard`], whose
//! `Drop` performs the synchronous release write if the step is unwound
//! mid-await.

use crate::error::{InjectError, MacroError};
use crate::macros::{EventHandler, Macro, RunParams};
use crate::observer::Action;
use crate::value::{Kind, Value};
use keyloom_codes::{EV_KEY, EV_REL, InputEvent};
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn};

pub type ChildId = usize;

#[derive(Debug, Clone)]
pub enum Step {
    /// `k(symbol)`: down, pause, up, pause
    Key { code: u16 },
    /// `w(ms)`
    Wait { duration_ms: Value },
    /// `r(n, child)`: run the child to completion n times
    Repeat { count: Value, child: ChildId },
    /// `h(symbol)`: press on entry, release when the trigger releases
    HoldKey { code: u16 },
    /// `h(child)`: rerun the child, never truncated, while the trigger is held
    HoldMacro { child: ChildId },
    /// `h()`: block until the trigger releases
    Hold,
    /// `m(symbol, child)`: run the child inside a modifier press
    Modify { code: u16, child: ChildId },
    /// `mouse(direction, speed)`: relative motion while the trigger is held
    Mouse { axis: u16, sign: i32, speed: Value },
    /// `wheel(direction, speed)`: scroll while held, one tick per 1/speed s
    Wheel { code: u16, sign: i32, speed: Value },
    /// `e(type, code, value)`: one raw event
    Event { kind: u16, code: u16, value: Value },
    /// `set(name, value)`
    Set { name: String, value: Value },
    /// `if_eq(v1, v2, then, else)`
    IfEq {
        lhs: Value,
        rhs: Value,
        then: Option<ChildId>,
        otherwise: Option<ChildId>,
    },
    /// `ifeq(name, value, then, else)` - legacy form, first argument is
    /// always a variable name even when it looks like a literal
    IfVarEq {
        name: String,
        rhs: Value,
        then: Option<ChildId>,
        otherwise: Option<ChildId>,
    },
    /// `if_tap(then, else, timeout_ms)`
    IfTap {
        then: Option<ChildId>,
        otherwise: Option<ChildId>,
        timeout_ms: Value,
    },
    /// `if_single(then, else, timeout_ms)`
    IfSingle {
        then: Option<ChildId>,
        otherwise: Option<ChildId>,
        timeout_ms: Option<Value>,
    },
}

/// Owns a pressed key until the matching release has been written.
///
/// The normal path calls [`ReleaseGuard::release`] so a handler failure
/// propagates; if the step is cancelled mid-await the `Drop` impl still
/// writes the release, because a key leaked into the kernel stays stuck
/// until the device disappears.
struct ReleaseGuard<'a> {
    handler: &'a dyn EventHandler,
    code: u16,
    armed: bool,
}

impl<'a> ReleaseGuard<'a> {
    fn press(handler: &'a dyn EventHandler, code: u16) -> Result<Self, InjectError> {
        handler.write(EV_KEY, code, 1)?;
        Ok(ReleaseGuard {
            handler,
            code,
            armed: true,
        })
    }

    fn release(mut self) -> Result<(), InjectError> {
        self.armed = false;
        self.handler.write(EV_KEY, self.code, 0)
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.handler.write(EV_KEY, self.code, 0) {
                warn!(code = self.code, %err, "could not release key during unwind");
            }
        }
    }
}

async fn keystroke_pause(params: &RunParams) {
    time::sleep(params.keystroke_sleep).await;
}

fn millis(ms: f64) -> Duration {
    Duration::from_secs_f64((ms / 1000.0).max(0.0))
}

fn as_number(value: &Value, op: &str) -> Result<f64, MacroError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(x) => Ok(*x),
        other => Err(MacroError::Runtime(format!(
            "{op}: expected a number, got \"{other}\""
        ))),
    }
}

fn as_integer(value: &Value, op: &str) -> Result<i64, MacroError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(MacroError::Runtime(format!(
            "{op}: expected an integer, got \"{other}\""
        ))),
    }
}

async fn run_branch(mac: &Macro, branch: Option<ChildId>, handler: &dyn EventHandler) {
    if let Some(child) = branch {
        mac.child(child).run(handler).await;
    }
}

impl Step {
    pub(crate) async fn run(
        &self,
        mac: &Macro,
        params: &RunParams,
        handler: &dyn EventHandler,
    ) -> Result<(), MacroError> {
        match self {
            Step::Key { code } => {
                handler.write(EV_KEY, *code, 1)?;
                keystroke_pause(params).await;
                handler.write(EV_KEY, *code, 0)?;
                keystroke_pause(params).await;
                Ok(())
            }

            Step::Wait { duration_ms } => {
                let duration_ms = mac.variables().resolve(
                    duration_ms,
                    &[Kind::Int, Kind::Float],
                    "w (wait)",
                    1,
                )?;
                time::sleep(millis(as_number(&duration_ms, "w (wait)")?)).await;
                Ok(())
            }

            Step::Repeat { count, child } => {
                // a variable count resolves once per invocation, not per lap
                let count = mac
                    .variables()
                    .resolve(count, &[Kind::Int], "r (repeat)", 1)?;
                for _ in 0..as_integer(&count, "r (repeat)")?.max(0) {
                    mac.child(*child).run(handler).await;
                }
                Ok(())
            }

            Step::HoldKey { code } => {
                let pressed = ReleaseGuard::press(handler, *code)?;
                mac.trigger.wait_released().await;
                pressed.release()?;
                Ok(())
            }

            Step::HoldMacro { child } => {
                // checked between laps, never mid-child, so the child can
                // never be truncated with keys still down
                while mac.is_holding() {
                    mac.child(*child).run(handler).await;
                }
                Ok(())
            }

            Step::Hold => {
                mac.trigger.wait_released().await;
                Ok(())
            }

            Step::Modify { code, child } => {
                keystroke_pause(params).await;
                let pressed = ReleaseGuard::press(handler, *code)?;
                keystroke_pause(params).await;
                mac.child(*child).run(handler).await;
                keystroke_pause(params).await;
                pressed.release()?;
                keystroke_pause(params).await;
                Ok(())
            }

            Step::Mouse { axis, sign, speed } => {
                let speed = mac.variables().resolve(speed, &[Kind::Int], "mouse", 2)?;
                let speed = i32::try_from(as_integer(&speed, "mouse")?).map_err(|_| {
                    MacroError::Runtime("mouse: speed out of range".to_string())
                })?;
                let delta = sign * speed;
                while mac.is_holding() {
                    handler.write(EV_REL, *axis, delta)?;
                    keystroke_pause(params).await;
                }
                Ok(())
            }

            Step::Wheel { code, sign, speed } => {
                let speed = mac.variables().resolve(speed, &[Kind::Int], "wheel", 2)?;
                let speed = as_integer(&speed, "wheel")?;
                if speed == 0 {
                    return Err(MacroError::Runtime(
                        "wheel: speed must not be zero".to_string(),
                    ));
                }
                // scrolling outruns pointer motion, so the cadence slows
                // with speed instead of scaling the delta
                let pause = Duration::from_secs_f64((1.0 / speed as f64).max(0.0));
                while mac.is_holding() {
                    handler.write(EV_REL, *code, *sign)?;
                    time::sleep(pause).await;
                }
                Ok(())
            }

            Step::Event { kind, code, value } => {
                let value = mac
                    .variables()
                    .resolve(value, &[Kind::Int], "e (event)", 3)?;
                let value = i32::try_from(as_integer(&value, "e (event)")?).map_err(|_| {
                    MacroError::Runtime("e (event): value out of range".to_string())
                })?;
                handler.write(*kind, *code, value)?;
                keystroke_pause(params).await;
                Ok(())
            }

            Step::Set { name, value } => {
                let resolved = mac.variables().resolve_raw(value).ok_or_else(|| {
                    MacroError::Runtime(format!(
                        "set: \"{value}\" is not set, nothing to assign to \"{name}\""
                    ))
                })?;
                debug!(name = name.as_str(), value = %resolved, "set variable");
                mac.variables().set(name.clone(), resolved);
                Ok(())
            }

            Step::IfEq {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                let lhs = mac.variables().resolve_raw(lhs);
                let rhs = mac.variables().resolve_raw(rhs);
                if lhs == rhs {
                    run_branch(mac, *then, handler).await;
                } else {
                    run_branch(mac, *otherwise, handler).await;
                }
                Ok(())
            }

            Step::IfVarEq {
                name,
                rhs,
                then,
                otherwise,
            } => {
                let current = mac.variables().get(name);
                debug!(name = name.as_str(), value = ?current, "ifeq comparison");
                if current.as_ref() == Some(rhs) {
                    run_branch(mac, *then, handler).await;
                } else {
                    run_branch(mac, *otherwise, handler).await;
                }
                Ok(())
            }

            Step::IfTap {
                then,
                otherwise,
                timeout_ms,
            } => {
                let timeout_ms = mac.variables().resolve(
                    timeout_ms,
                    &[Kind::Int, Kind::Float],
                    "if_tap",
                    3,
                )?;
                let deadline = millis(as_number(&timeout_ms, "if_tap")?);

                // a full press+release cycle: when already held, only the
                // release is outstanding
                let tap = async {
                    if mac.is_holding() {
                        mac.trigger.wait_released().await;
                    } else {
                        mac.trigger.wait_pressed().await;
                        mac.trigger.wait_released().await;
                    }
                };

                match time::timeout(deadline, tap).await {
                    Ok(()) => run_branch(mac, *then, handler).await,
                    Err(_) => run_branch(mac, *otherwise, handler).await,
                }
                Ok(())
            }

            Step::IfSingle {
                then,
                otherwise,
                timeout_ms,
            } => {
                let triggering = mac
                    .observer
                    .latest()
                    .map(|(event, _)| event.identity())
                    .ok_or_else(|| {
                        MacroError::Runtime(
                            "if_single: no triggering event has been observed".to_string(),
                        )
                    })?;

                let deadline = match timeout_ms {
                    Some(timeout_ms) => {
                        let timeout_ms = mac.variables().resolve(
                            timeout_ms,
                            &[Kind::Int, Kind::Float],
                            "if_single",
                            3,
                        )?;
                        Some(millis(as_number(&timeout_ms, "if_single")?))
                    }
                    None => None,
                };

                // wake on the trigger key's own release, or on any other
                // key going down in the meantime
                let wake = mac.observer.wait_matching(|event: &InputEvent, action| {
                    event.identity() == triggering
                        || matches!(action, Action::Press | Action::PressNegative)
                });

                let woke = match deadline {
                    Some(deadline) => time::timeout(deadline, wake).await.is_ok(),
                    None => {
                        wake.await;
                        true
                    }
                };

                if woke {
                    let newest = mac.observer.latest().map(|(event, _)| event.identity());
                    if newest == Some(triggering) {
                        // released without any other key in between
                        run_branch(mac, *then, handler).await;
                        return Ok(());
                    }
                }

                run_branch(mac, *otherwise, handler).await;
                Ok(())
            }
        }
    }
}
