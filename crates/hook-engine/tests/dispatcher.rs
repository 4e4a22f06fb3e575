use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use steadyhand_filter_core::{EmaParams, Phase, TremorParams};
use steadyhand_hook_engine::{
    CalibrationSink, EngineControl, FailingInjector, HookDispatcher, InjectedMove,
    LatencyProfiler, MotionSample, PauseReason, RecordingInjector,
};
use steadyhand_platform_core::{HookDecision, MotionEvent};

const MAGIC: usize = 0x5354_4459;

fn ema() -> EmaParams {
    EmaParams {
        v_min: 50.0,
        v_max: 250.0,
        alpha_min: 0.1,
        alpha_max: 0.8,
    }
}

fn tremor() -> TremorParams {
    TremorParams {
        jitter_deadzone_px: 1.0,
        jitter_speed_max: 40.0,
        extra_damp_factor: 0.2,
    }
}

fn dispatcher(user_enabled: bool) -> HookDispatcher<RecordingInjector> {
    let control = Arc::new(EngineControl::new(user_enabled, ema(), tremor()));
    HookDispatcher::new(
        control,
        RecordingInjector::new(),
        MAGIC,
        LatencyProfiler::new(Duration::from_secs(3600)),
    )
}

fn moved(dx: i32, dy: i32) -> InjectedMove {
    InjectedMove { dx, dy, tag: MAGIC }
}

#[test]
fn own_events_never_touch_state() {
    let mut d = dispatcher(true);

    assert_eq!(d.on_event(5.0, 5.0, 0.0, MAGIC), HookDecision::PassThrough);
    assert_eq!(d.last_sample(), None);
    assert!(!d.ema().state().initialized);

    d.on_event(0.0, 0.0, 0.0, 0);
    let before = d.last_sample();
    assert_eq!(
        d.on_motion(MotionEvent::new(300, 300, MAGIC)),
        HookDecision::PassThrough
    );
    assert_eq!(d.last_sample(), before);
    assert!(d.injector().moves().is_empty());
    assert_eq!(d.stats().own_events, 2);
}

#[test]
fn first_real_event_is_a_cold_start() {
    let mut d = dispatcher(true);
    assert_eq!(d.on_event(10.0, 20.0, 1.0, 0), HookDecision::PassThrough);
    assert_eq!(
        d.last_sample(),
        Some(MotionSample {
            x: 10.0,
            y: 20.0,
            t: 1.0
        })
    );
    assert!(d.injector().moves().is_empty());
}

#[test]
fn enabled_motion_is_suppressed_and_reinjected_smoothed() {
    let mut d = dispatcher(true);

    d.on_event(0.0, 0.0, 0.0, 0);
    // Cold EMA passes the first delta through.
    assert_eq!(d.on_event(10.0, 0.0, 0.01, 0), HookDecision::Suppress);
    // 200 px/s: alpha 0.625, so 0.625 * 2 + 0.375 * 10 = 5.
    assert_eq!(d.on_event(12.0, 0.0, 0.02, 0), HookDecision::Suppress);

    assert_eq!(d.injector().moves(), &[moved(10, 0), moved(5, 0)]);
    let stats = d.stats();
    assert_eq!(stats.injected, 2);
    assert_eq!(stats.suppressed, 2);
    assert_eq!(stats.received, 3);
}

#[test]
fn half_pixel_output_rounds_to_even() {
    for (dx, expected) in [(0.5, 0), (-0.5, 0), (1.5, 2), (2.5, 2)] {
        let mut d = dispatcher(true);
        d.on_event(0.0, 0.0, 0.0, 0);
        // Fast enough to clear the deadzone; the cold EMA passes it through.
        assert_eq!(d.on_event(dx, 0.0, 0.001, 0), HookDecision::Suppress);
        assert_eq!(d.injector().moves(), &[moved(expected, 0)], "dx={dx}");
    }
}

#[test]
fn latency_is_measured_only_for_filtered_events() {
    let mut d = dispatcher(true);
    let control = Arc::clone(d.control());

    d.on_event(0.0, 0.0, 0.0, 0);
    d.on_event(50.0, 50.0, 0.01, MAGIC);
    assert_eq!(d.profiler().pending_events(), 0);

    d.on_event(10.0, 0.0, 0.01, 0);
    assert_eq!(d.profiler().pending_events(), 1);

    control.start_calibration(Phase::Slow, CalibrationSink::new(|_, _, _, _| {}));
    d.on_event(20.0, 0.0, 0.02, 0);
    d.on_event(30.0, 0.0, 0.03, 0);
    control.stop_calibration();
    assert_eq!(d.profiler().pending_events(), 1);

    let mut disabled = dispatcher(false);
    for i in 0..5 {
        disabled.on_event(f64::from(i) * 10.0, 0.0, f64::from(i) * 0.01, 0);
    }
    assert_eq!(disabled.profiler().pending_events(), 0);
}

#[test]
fn disabled_engine_forwards_everything() {
    let mut d = dispatcher(false);
    for i in 0..5 {
        let decision = d.on_event(f64::from(i) * 10.0, 0.0, f64::from(i) * 0.01, 0);
        assert_eq!(decision, HookDecision::PassThrough);
    }
    assert!(d.injector().moves().is_empty());
    assert!(!d.ema().state().initialized);
}

#[test]
fn pause_and_resume_follow_the_blacklist_reason() {
    let mut d = dispatcher(true);
    let control = Arc::clone(d.control());

    d.on_event(0.0, 0.0, 0.0, 0);
    assert_eq!(d.on_event(10.0, 0.0, 0.01, 0), HookDecision::Suppress);

    control.pause(PauseReason::Blacklist);
    assert_eq!(d.on_event(20.0, 0.0, 0.02, 0), HookDecision::PassThrough);

    control.resume(PauseReason::Blacklist);
    assert_eq!(d.on_event(30.0, 0.0, 0.03, 0), HookDecision::Suppress);
    assert_eq!(d.injector().moves().len(), 2);
}

#[test]
fn repeated_timestamp_is_dropped_only_while_enabled() {
    let mut d = dispatcher(true);
    d.on_event(0.0, 0.0, 0.5, 0);
    assert_eq!(d.on_event(3.0, 0.0, 0.5, 0), HookDecision::Suppress);
    assert!(d.injector().moves().is_empty());
    assert!(!d.ema().state().initialized);

    let mut d = dispatcher(false);
    d.on_event(0.0, 0.0, 0.5, 0);
    assert_eq!(d.on_event(3.0, 0.0, 0.5, 0), HookDecision::PassThrough);
}

#[test]
fn jitter_in_the_deadzone_is_swallowed_without_injection() {
    let mut d = dispatcher(true);
    d.on_event(100.0, 100.0, 0.0, 0);
    // 0.5 px over 0.1 s: under both jitter thresholds.
    assert_eq!(d.on_event(100.5, 100.0, 0.1, 0), HookDecision::Suppress);
    assert!(d.injector().moves().is_empty());
    assert_eq!(d.ema().state().sx, 0.0);
}

#[test]
fn calibration_routes_deltas_to_the_sink_and_forwards_events() {
    let mut d = dispatcher(true);
    let control = Arc::clone(d.control());
    let seen: Arc<Mutex<Vec<(Phase, f64, f64, f64)>>> = Arc::default();

    d.on_event(0.0, 0.0, 0.0, 0);

    let sink_seen = Arc::clone(&seen);
    control.start_calibration(
        Phase::Slow,
        CalibrationSink::new(move |phase, dx, dy, dt| {
            sink_seen.lock().unwrap().push((phase, dx, dy, dt));
        }),
    );

    // The phase starts cold: the pre-calibration sample is forgotten.
    assert_eq!(d.on_event(4.0, 0.0, 0.25, 0), HookDecision::PassThrough);
    assert!(seen.lock().unwrap().is_empty());

    assert_eq!(d.on_event(4.0, 3.0, 0.5, 0), HookDecision::PassThrough);
    assert_eq!(*seen.lock().unwrap(), vec![(Phase::Slow, 0.0, 3.0, 0.25)]);
    assert!(d.injector().moves().is_empty());

    control.stop_calibration();
    // Smoothing restarts cold as well.
    assert_eq!(d.on_event(8.0, 3.0, 0.75, 0), HookDecision::PassThrough);
    assert_eq!(d.on_event(16.0, 3.0, 1.0, 0), HookDecision::Suppress);
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(d.stats().calibration_samples, 1);
}

#[test]
fn injection_failure_fails_open_and_keeps_tracking() {
    let control = Arc::new(EngineControl::new(true, ema(), tremor()));
    let mut d = HookDispatcher::new(
        control,
        FailingInjector::new(),
        MAGIC,
        LatencyProfiler::new(Duration::from_secs(3600)),
    );

    d.on_event(0.0, 0.0, 0.0, 0);
    assert_eq!(d.on_event(10.0, 0.0, 0.01, 0), HookDecision::PassThrough);
    assert_eq!(
        d.last_sample(),
        Some(MotionSample {
            x: 10.0,
            y: 0.0,
            t: 0.01
        })
    );
    assert_eq!(d.injector().attempts(), 1);
    assert_eq!(d.stats().failures, 1);
    assert_eq!(d.stats().suppressed, 0);
}

#[test]
fn parameter_swaps_reach_the_next_event() {
    let mut d = dispatcher(true);
    let control = Arc::clone(d.control());

    d.on_event(0.0, 0.0, 0.0, 0);
    d.on_event(10.0, 0.0, 0.01, 0);

    let swapped = EmaParams {
        v_min: 10.0,
        v_max: 20.0,
        ..ema()
    };
    control.set_ema_params(swapped);
    d.on_event(20.0, 0.0, 0.02, 0);
    assert_eq!(*d.ema().params(), swapped);
}

#[test]
fn toggling_from_another_thread_takes_effect() {
    let mut d = dispatcher(true);
    let control = Arc::clone(d.control());
    let toggles = Arc::new(AtomicUsize::new(0));

    d.on_event(0.0, 0.0, 0.0, 0);

    let counter = Arc::clone(&toggles);
    std::thread::spawn(move || {
        control.toggle_user_enabled();
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .join()
    .unwrap();

    assert_eq!(toggles.load(Ordering::SeqCst), 1);
    assert_eq!(d.on_event(10.0, 0.0, 0.01, 0), HookDecision::PassThrough);
}

proptest! {
    #[test]
    fn own_events_are_invisible_to_the_pipeline(
        steps in prop::collection::vec((-40i32..40, -40i32..40, 1u32..40, any::<bool>()), 1..60)
    ) {
        let mut plain = dispatcher(true);
        let mut echoed = dispatcher(true);
        let (mut x, mut y, mut t) = (0.0, 0.0, 0.0);

        for (dx, dy, dt_ms, echo) in steps {
            x += f64::from(dx);
            y += f64::from(dy);
            t += f64::from(dt_ms) / 1000.0;
            if echo {
                prop_assert_eq!(
                    echoed.on_event(x + 7.0, y - 3.0, t, MAGIC),
                    HookDecision::PassThrough
                );
            }
            prop_assert_eq!(plain.on_event(x, y, t, 0), echoed.on_event(x, y, t, 0));
        }
        prop_assert_eq!(plain.injector().moves(), echoed.injector().moves());
    }
}
