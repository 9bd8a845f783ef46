//! End-to-end macro execution tests
//!
//! Every test drives a parsed macro against a recording handler on a paused
//! tokio clock, so keystroke pauses and timeouts advance deterministically.
//! The default preset is used throughout: keystroke pause of 10ms.

use keyloom_codes::{
    InputEvent, EV_KEY, EV_REL, KEY_A, KEY_B, KEY_F1, KEY_LEFTSHIFT, KEY_X, REL_WHEEL, REL_Y,
};
use keyloom_engine::{parse, Action, Context, EventHandler, InjectError, Macro};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;

/// Collects every `(type, code, value)` the engine writes.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(u16, u16, i32)>>,
}

impl Recorder {
    fn snapshot(&self) -> Vec<(u16, u16, i32)> {
        self.events.lock().unwrap().clone()
    }
}

impl EventHandler for Recorder {
    fn write(&self, kind: u16, code: u16, value: i32) -> Result<(), InjectError> {
        self.events.lock().unwrap().push((kind, code, value));
        Ok(())
    }
}

/// A handler whose writes always fail, for the error path.
struct BrokenDevice;

impl EventHandler for BrokenDevice {
    fn write(&self, _kind: u16, _code: u16, _value: i32) -> Result<(), InjectError> {
        Err(InjectError::new("uinput write failed"))
    }
}

fn spawn_run(mac: Arc<Macro>, recorder: Arc<Recorder>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { mac.run(recorder.as_ref()).await })
}

/// Fresh context per test, with engine logs visible under `RUST_LOG`.
fn setup() -> Context {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
    Context::default()
}

#[tokio::test(start_paused = true)]
async fn test_single_keystroke_events_and_timing() {
    let ctx = setup();
    let mac = parse("k(KEY_A)", &ctx).unwrap();
    let recorder = Recorder::default();

    let started = time::Instant::now();
    mac.run(&recorder).await;

    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_A, 1), (EV_KEY, KEY_A, 0)]
    );
    assert_eq!(started.elapsed(), Duration::from_millis(20));
}

#[tokio::test(start_paused = true)]
async fn test_repeat_runs_child_to_completion() {
    let ctx = setup();
    let mac = parse("r(3, k(KEY_A).w(10))", &ctx).unwrap();
    let recorder = Recorder::default();

    let started = time::Instant::now();
    mac.run(&recorder).await;

    let down_up = [(EV_KEY, KEY_A, 1), (EV_KEY, KEY_A, 0)];
    let expected: Vec<_> = down_up.iter().cycle().take(6).copied().collect();
    assert_eq!(recorder.snapshot(), expected);
    // three laps of down+pause+up+pause+wait
    assert_eq!(started.elapsed(), Duration::from_millis(90));
}

#[tokio::test(start_paused = true)]
async fn test_repeat_zero_emits_nothing() {
    let ctx = setup();
    let mac = parse("r(0, k(KEY_A))", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert!(recorder.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_repeat_count_from_variable() {
    let ctx = setup();
    let mac = parse("set(n, 2).r($n, k(KEY_A))", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(recorder.snapshot().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_modifier_wraps_child() {
    let ctx = setup();
    let mac = parse(
        "w(1000).m(KEY_LEFTSHIFT, r(2, k(KEY_A))).w(10).k(KEY_B)",
        &ctx,
    )
    .unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;

    assert_eq!(
        recorder.snapshot(),
        vec![
            (EV_KEY, KEY_LEFTSHIFT, 1),
            (EV_KEY, KEY_A, 1),
            (EV_KEY, KEY_A, 0),
            (EV_KEY, KEY_A, 1),
            (EV_KEY, KEY_A, 0),
            (EV_KEY, KEY_LEFTSHIFT, 0),
            (EV_KEY, KEY_B, 1),
            (EV_KEY, KEY_B, 0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hold_key_until_trigger_release() {
    let ctx = setup();
    let mac = Arc::new(parse("h(KEY_A)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.snapshot(), vec![(EV_KEY, KEY_A, 1)]);

    mac.release_trigger();
    run.await.unwrap();
    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_A, 1), (EV_KEY, KEY_A, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hold_bare_blocks_until_release() {
    let ctx = setup();
    let mac = Arc::new(parse("h().k(KEY_A)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(30)).await;
    assert!(recorder.snapshot().is_empty());

    mac.release_trigger();
    run.await.unwrap();
    assert_eq!(recorder.snapshot().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hold_macro_never_truncates_child() {
    let ctx = setup();
    let mac = Arc::new(parse("h(k(KEY_A))", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    // release lands mid-child; the running lap must still complete
    time::sleep(Duration::from_millis(25)).await;
    mac.release_trigger();
    run.await.unwrap();

    let events = recorder.snapshot();
    assert_eq!(events.len(), 4);
    let downs = events.iter().filter(|(_, _, value)| *value == 1).count();
    let ups = events.iter().filter(|(_, _, value)| *value == 0).count();
    assert_eq!(downs, ups);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_still_releases_held_key() {
    let ctx = setup();
    let mac = Arc::new(parse("h(KEY_A)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(5)).await;
    assert_eq!(recorder.snapshot(), vec![(EV_KEY, KEY_A, 1)]);

    run.abort();
    assert!(run.await.is_err());

    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_A, 1), (EV_KEY, KEY_A, 0)]
    );
    assert!(!mac.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_releases_modifier() {
    let ctx = setup();
    let mac = Arc::new(parse("m(KEY_LEFTSHIFT, h())", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(30)).await;
    assert_eq!(recorder.snapshot(), vec![(EV_KEY, KEY_LEFTSHIFT, 1)]);

    run.abort();
    assert!(run.await.is_err());
    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_LEFTSHIFT, 1), (EV_KEY, KEY_LEFTSHIFT, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reentry_is_rejected_without_side_effects() {
    let ctx = setup();
    let mac = Arc::new(parse("w(100).k(KEY_A)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));
    time::sleep(Duration::from_millis(1)).await;
    assert!(mac.is_running());

    // second invocation returns immediately and injects nothing
    mac.run(recorder.as_ref()).await;
    assert!(recorder.snapshot().is_empty());
    assert!(mac.is_running());

    run.await.unwrap();
    assert_eq!(recorder.snapshot().len(), 2);
    assert!(!mac.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_if_tap_release_before_deadline() {
    for (release_at, expected_key) in [(40u64, KEY_A), (99, KEY_A)] {
        let ctx = setup();
        let mac = Arc::new(parse("if_tap(k(KEY_A), k(KEY_B), 100)", &ctx).unwrap());
        let recorder = Arc::new(Recorder::default());

        mac.press_trigger();
        let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

        time::sleep(Duration::from_millis(release_at)).await;
        mac.release_trigger();
        run.await.unwrap();

        assert_eq!(
            recorder.snapshot(),
            vec![(EV_KEY, expected_key, 1), (EV_KEY, expected_key, 0)]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_if_tap_deadline_exceeded() {
    let ctx = setup();
    let mac = Arc::new(parse("if_tap(k(KEY_A), k(KEY_B), 100)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(101)).await;
    mac.release_trigger();
    run.await.unwrap();

    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_B, 1), (EV_KEY, KEY_B, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_if_tap_waits_for_full_cycle_when_not_held() {
    let ctx = setup();
    let mac = Arc::new(parse("if_tap(k(KEY_A), k(KEY_B), 100)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    // trigger not held at step entry: a press followed by a release counts
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));
    time::sleep(Duration::from_millis(20)).await;
    mac.press_trigger();
    time::sleep(Duration::from_millis(20)).await;
    mac.release_trigger();
    run.await.unwrap();

    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_A, 1), (EV_KEY, KEY_A, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_if_single_release_without_other_key() {
    let ctx = setup();
    let mac = Arc::new(parse("if_single(k(KEY_A), k(KEY_B))", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.notify(InputEvent::new(EV_KEY, KEY_F1, 1), Action::Press);
    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(5)).await;
    mac.notify(InputEvent::new(EV_KEY, KEY_F1, 0), Action::Release);
    mac.release_trigger();
    run.await.unwrap();

    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_A, 1), (EV_KEY, KEY_A, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_if_single_competing_press_takes_else() {
    let ctx = setup();
    let mac = Arc::new(parse("if_single(k(KEY_A), k(KEY_B))", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.notify(InputEvent::new(EV_KEY, KEY_F1, 1), Action::Press);
    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(5)).await;
    mac.notify(InputEvent::new(EV_KEY, KEY_X, 1), Action::Press);
    run.await.unwrap();

    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_B, 1), (EV_KEY, KEY_B, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_if_single_timeout_takes_else() {
    let ctx = setup();
    let mac = Arc::new(parse("if_single(k(KEY_A), k(KEY_B), 100)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.notify(InputEvent::new(EV_KEY, KEY_F1, 1), Action::Press);
    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    run.await.unwrap();
    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_B, 1), (EV_KEY, KEY_B, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_set_then_if_eq_takes_then_branch() {
    let ctx = setup();
    let mac = parse("set(x, 5).if_eq($x, 5, k(KEY_A), k(KEY_B))", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(
        recorder.snapshot(),
        vec![(EV_KEY, KEY_A, 1), (EV_KEY, KEY_A, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_if_eq_with_strings_and_unset_variables() {
    let ctx = setup();
    let mac = parse(
        "set(x, \"foo\").if_eq($x, \"foo\", k(KEY_A), k(KEY_B))",
        &ctx,
    )
    .unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(recorder.snapshot()[0], (EV_KEY, KEY_A, 1));

    // two unset variables resolve to the same absent value
    let mac = parse("if_eq($nope, $nada, k(KEY_A), k(KEY_B))", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(recorder.snapshot()[0], (EV_KEY, KEY_A, 1));
}

#[tokio::test(start_paused = true)]
async fn test_ifeq_legacy_treats_first_argument_as_name() {
    let ctx = setup();
    let mac = parse("set(x, 5).ifeq(x, 5, k(KEY_A), k(KEY_B))", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(recorder.snapshot()[0], (EV_KEY, KEY_A, 1));

    // even a literal-looking first argument is a variable name; "5" is
    // unset here, so the else branch fires
    let mac = parse("ifeq(5, 5, k(KEY_A), k(KEY_B))", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(recorder.snapshot()[0], (EV_KEY, KEY_B, 1));
}

#[tokio::test(start_paused = true)]
async fn test_mouse_with_trigger_released_emits_nothing() {
    let ctx = setup();
    let mac = parse("mouse(up, 4)", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert!(recorder.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_mouse_moves_while_held() {
    let ctx = setup();
    let mac = Arc::new(parse("mouse(up, 4)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    time::sleep(Duration::from_millis(35)).await;
    mac.release_trigger();
    run.await.unwrap();

    let events = recorder.snapshot();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|event| *event == (EV_REL, REL_Y, -4)));
}

#[tokio::test(start_paused = true)]
async fn test_wheel_cadence_is_inverse_speed() {
    let ctx = setup();
    let mac = Arc::new(parse("wheel(up, 5)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));

    // 1/5 s per tick: ticks at 0, 200 and 400ms
    time::sleep(Duration::from_millis(450)).await;
    mac.release_trigger();
    run.await.unwrap();

    let events = recorder.snapshot();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|event| *event == (EV_REL, REL_WHEEL, 1)));
}

#[tokio::test(start_paused = true)]
async fn test_wheel_zero_speed_from_variable_aborts() {
    let ctx = setup();
    let mac = Arc::new(parse("set(s, 0).wheel(up, $s)", &ctx).unwrap());
    let recorder = Arc::new(Recorder::default());

    mac.press_trigger();
    let run = spawn_run(Arc::clone(&mac), Arc::clone(&recorder));
    run.await.unwrap();

    assert!(recorder.snapshot().is_empty());
    assert!(!mac.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_runtime_variable_error_terminates_run() {
    let ctx = setup();
    let mac = parse("set(n, \"fast\").r($n, k(KEY_A)).k(KEY_B)", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    // the repeat step aborts the run; KEY_B is never reached
    assert!(recorder.snapshot().is_empty());
    assert!(!mac.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_handler_failure_stops_the_run() {
    let ctx = setup();
    let mac = parse("k(KEY_A).k(KEY_B)", &ctx).unwrap();
    mac.run(&BrokenDevice).await;
    assert!(!mac.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_raw_event_emission() {
    let ctx = setup();
    let mac = parse("e(EV_KEY, KEY_A, 2)", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(recorder.snapshot(), vec![(EV_KEY, KEY_A, 2)]);
}

#[tokio::test(start_paused = true)]
async fn test_emitted_events_are_within_declared_capabilities() {
    let ctx = setup();
    let mac = parse(
        "k(KEY_A).e(EV_REL, REL_WHEEL, 1).m(KEY_LEFTSHIFT, k(KEY_B))",
        &ctx,
    )
    .unwrap();
    let caps = mac.capabilities();
    let recorder = Recorder::default();
    mac.run(&recorder).await;

    let events = recorder.snapshot();
    assert!(!events.is_empty());
    for (kind, code, _) in events {
        assert!(caps.contains(kind, code), "undeclared ({kind}, {code})");
    }
}

#[tokio::test(start_paused = true)]
async fn test_set_copies_resolved_value() {
    let ctx = setup();
    let mac = parse("set(a, 3).set(b, $a).if_eq($b, 3, k(KEY_A), k(KEY_B))", &ctx).unwrap();
    let recorder = Recorder::default();
    mac.run(&recorder).await;
    assert_eq!(recorder.snapshot()[0], (EV_KEY, KEY_A, 1));
}
