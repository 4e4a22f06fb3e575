//! Engine state shared between the hook thread and everything else.
//!
//! The hook thread reads this on every event and must never block, so every
//! field is an atomic or an `arc_swap` slot. Writers (hotkeys, the blacklist
//! poller, the calibration session) never take a lock the hook could wait on.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use steadyhand_common::config::AppConfig;
use steadyhand_filter_core::{EmaParams, Phase, TremorParams};

/// What the dispatcher does with real motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Filter and re-inject (when enabled).
    Smoothing,
    /// Observe only: deltas go to the calibration sink, real events pass.
    Calibration(Phase),
}

impl Mode {
    fn encode(self) -> u8 {
        match self {
            Mode::Smoothing => 0,
            Mode::Calibration(Phase::Slow) => 1,
            Mode::Calibration(Phase::Fast) => 2,
        }
    }

    fn decode(raw: u8) -> Mode {
        match raw {
            1 => Mode::Calibration(Phase::Slow),
            2 => Mode::Calibration(Phase::Fast),
            _ => Mode::Smoothing,
        }
    }
}

/// Independent reasons for pausing the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseReason {
    /// A blacklisted process owns the foreground window.
    Blacklist,
    /// The engine is being torn down.
    Shutdown,
}

impl PauseReason {
    fn bit(self) -> u32 {
        match self {
            PauseReason::Blacklist => 1 << 0,
            PauseReason::Shutdown => 1 << 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PauseReason::Blacklist => "blacklist",
            PauseReason::Shutdown => "shutdown",
        }
    }
}

type SinkFn = dyn Fn(Phase, f64, f64, f64) + Send + Sync;

/// Receives calibration deltas inline on the hook thread.
///
/// The callback must be O(1) and must not block.
pub struct CalibrationSink {
    record: Box<SinkFn>,
}

impl CalibrationSink {
    pub fn new(record: impl Fn(Phase, f64, f64, f64) + Send + Sync + 'static) -> Self {
        Self {
            record: Box::new(record),
        }
    }

    pub fn record(&self, phase: Phase, dx: f64, dy: f64, dt: f64) {
        (self.record)(phase, dx, dy, dt);
    }
}

impl std::fmt::Debug for CalibrationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationSink").finish_non_exhaustive()
    }
}

/// Mode, pause, and user flags plus the live filter parameters.
#[derive(Debug)]
pub struct EngineControl {
    user_enabled: AtomicBool,
    pause_reasons: AtomicU32,
    mode: AtomicU8,
    /// Bumped whenever the dispatcher must forget its last sample.
    sample_epoch: AtomicU64,
    sink: ArcSwapOption<CalibrationSink>,
    ema_params: ArcSwap<EmaParams>,
    tremor_params: ArcSwap<TremorParams>,
}

impl EngineControl {
    pub fn new(user_enabled: bool, ema: EmaParams, tremor: TremorParams) -> Self {
        Self {
            user_enabled: AtomicBool::new(user_enabled),
            pause_reasons: AtomicU32::new(0),
            mode: AtomicU8::new(Mode::Smoothing.encode()),
            sample_epoch: AtomicU64::new(0),
            sink: ArcSwapOption::empty(),
            ema_params: ArcSwap::from_pointee(ema),
            tremor_params: ArcSwap::from_pointee(tremor),
        }
    }

    pub fn from_config(config: &AppConfig) -> Arc<Self> {
        Arc::new(Self::new(
            config.enabled_on_start,
            EmaParams::from_config(config),
            TremorParams::from_config(config),
        ))
    }

    /// `user_enabled ∧ no pause reasons ∧ mode == Smoothing`.
    pub fn enabled(&self) -> bool {
        self.enabled_in(self.mode())
    }

    /// [`enabled`](Self::enabled) against a mode the caller already loaded.
    pub(crate) fn enabled_in(&self, mode: Mode) -> bool {
        mode == Mode::Smoothing
            && self.user_enabled()
            && self.pause_reasons.load(Ordering::Acquire) == 0
    }

    pub fn user_enabled(&self) -> bool {
        self.user_enabled.load(Ordering::Acquire)
    }

    pub fn set_user_enabled(&self, enabled: bool) {
        self.user_enabled.store(enabled, Ordering::Release);
    }

    /// Flip the user flag and return the resulting `enabled()`.
    pub fn toggle_user_enabled(&self) -> bool {
        self.user_enabled.fetch_xor(true, Ordering::AcqRel);
        self.enabled()
    }

    /// Add `reason`. Returns `true` if it was not already present.
    pub fn pause(&self, reason: PauseReason) -> bool {
        let previous = self.pause_reasons.fetch_or(reason.bit(), Ordering::AcqRel);
        previous & reason.bit() == 0
    }

    /// Remove `reason`. Returns `true` if it was present.
    pub fn resume(&self, reason: PauseReason) -> bool {
        let previous = self
            .pause_reasons
            .fetch_and(!reason.bit(), Ordering::AcqRel);
        previous & reason.bit() != 0
    }

    pub fn is_paused_by(&self, reason: PauseReason) -> bool {
        self.pause_reasons.load(Ordering::Acquire) & reason.bit() != 0
    }

    pub fn is_paused(&self) -> bool {
        self.pause_reasons.load(Ordering::Acquire) != 0
    }

    pub fn mode(&self) -> Mode {
        Mode::decode(self.mode.load(Ordering::Acquire))
    }

    /// Route deltas to `sink` and stop smoothing until [`stop_calibration`](Self::stop_calibration).
    ///
    /// The epoch moves before the mode is published, so a reader that sees
    /// the new mode also sees the new epoch.
    pub fn start_calibration(&self, phase: Phase, sink: CalibrationSink) {
        self.sink.store(Some(Arc::new(sink)));
        self.sample_epoch.fetch_add(1, Ordering::AcqRel);
        self.mode
            .store(Mode::Calibration(phase).encode(), Ordering::Release);
        tracing::debug!(%phase, "Calibration phase started");
    }

    /// Back to smoothing; the sink is dropped.
    pub fn stop_calibration(&self) {
        self.sample_epoch.fetch_add(1, Ordering::AcqRel);
        self.mode.store(Mode::Smoothing.encode(), Ordering::Release);
        self.sink.store(None);
        tracing::debug!("Calibration phase stopped");
    }

    pub(crate) fn calibration_sink(&self) -> Option<Arc<CalibrationSink>> {
        self.sink.load_full()
    }

    /// Changes on every mode transition.
    pub fn sample_epoch(&self) -> u64 {
        self.sample_epoch.load(Ordering::Acquire)
    }

    pub fn ema_params(&self) -> EmaParams {
        **self.ema_params.load()
    }

    pub fn set_ema_params(&self, params: EmaParams) {
        self.ema_params.store(Arc::new(params));
    }

    pub fn tremor_params(&self) -> TremorParams {
        **self.tremor_params.load()
    }

    pub fn set_tremor_params(&self, params: TremorParams) {
        self.tremor_params.store(Arc::new(params));
    }

    /// Drop every mode and pause state so nothing lingers past teardown,
    /// then hold [`PauseReason::Shutdown`] so the hook passes events while
    /// it is removed.
    pub fn release_for_shutdown(&self) {
        if matches!(self.mode(), Mode::Calibration(_)) {
            self.stop_calibration();
        }
        self.pause_reasons
            .store(PauseReason::Shutdown.bit(), Ordering::Release);
        tracing::debug!("Engine state released for shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn control(user_enabled: bool) -> EngineControl {
        EngineControl::new(
            user_enabled,
            EmaParams {
                v_min: 50.0,
                v_max: 250.0,
                alpha_min: 0.1,
                alpha_max: 0.8,
            },
            TremorParams {
                jitter_deadzone_px: 1.0,
                jitter_speed_max: 40.0,
                extra_damp_factor: 0.2,
            },
        )
    }

    #[test]
    fn mode_encoding_round_trips() {
        for mode in [
            Mode::Smoothing,
            Mode::Calibration(Phase::Slow),
            Mode::Calibration(Phase::Fast),
        ] {
            assert_eq!(Mode::decode(mode.encode()), mode);
        }
    }

    #[test]
    fn enabled_truth_table() {
        for user in [false, true] {
            for paused in [false, true] {
                for mode in [
                    Mode::Smoothing,
                    Mode::Calibration(Phase::Slow),
                    Mode::Calibration(Phase::Fast),
                ] {
                    let c = control(user);
                    if paused {
                        c.pause(PauseReason::Blacklist);
                    }
                    if let Mode::Calibration(phase) = mode {
                        c.start_calibration(phase, CalibrationSink::new(|_, _, _, _| {}));
                    }
                    let expected = user && !paused && mode == Mode::Smoothing;
                    assert_eq!(c.enabled(), expected, "user={user} paused={paused} mode={mode:?}");
                }
            }
        }
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        for user in [false, true] {
            let c = control(user);
            let before = c.enabled();
            assert!(c.pause(PauseReason::Blacklist));
            assert!(!c.pause(PauseReason::Blacklist));
            assert!(!c.enabled());
            assert!(c.resume(PauseReason::Blacklist));
            assert!(!c.resume(PauseReason::Blacklist));
            assert_eq!(c.enabled(), before);
        }
    }

    #[test]
    fn pause_reasons_are_independent() {
        let c = control(true);
        c.pause(PauseReason::Blacklist);
        c.pause(PauseReason::Shutdown);
        c.resume(PauseReason::Blacklist);
        assert!(!c.enabled());
        assert!(c.is_paused_by(PauseReason::Shutdown));
        c.resume(PauseReason::Shutdown);
        assert!(c.enabled());
    }

    #[test]
    fn toggle_reports_resulting_enabled() {
        let c = control(true);
        assert!(!c.toggle_user_enabled());
        assert!(c.toggle_user_enabled());

        c.pause(PauseReason::Blacklist);
        assert!(!c.toggle_user_enabled());
        assert!(!c.toggle_user_enabled());
        assert!(c.user_enabled());
    }

    #[test]
    fn calibration_transitions_bump_epoch_and_swap_sink() {
        let c = control(true);
        let hits = Arc::new(AtomicUsize::new(0));
        let epoch = c.sample_epoch();

        let counter = Arc::clone(&hits);
        c.start_calibration(
            Phase::Fast,
            CalibrationSink::new(move |_, _, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(c.mode(), Mode::Calibration(Phase::Fast));
        assert!(c.sample_epoch() > epoch);
        c.calibration_sink().unwrap().record(Phase::Fast, 1.0, 1.0, 0.01);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let epoch = c.sample_epoch();
        c.stop_calibration();
        assert_eq!(c.mode(), Mode::Smoothing);
        assert!(c.calibration_sink().is_none());
        assert!(c.sample_epoch() > epoch);
    }

    #[test]
    fn release_for_shutdown_clears_everything() {
        let c = control(true);
        c.pause(PauseReason::Blacklist);
        c.start_calibration(Phase::Slow, CalibrationSink::new(|_, _, _, _| {}));

        c.release_for_shutdown();
        assert!(!c.is_paused_by(PauseReason::Blacklist));
        assert!(c.is_paused_by(PauseReason::Shutdown));
        assert_eq!(c.mode(), Mode::Smoothing);
        assert!(c.calibration_sink().is_none());
        assert!(c.user_enabled());
        assert!(!c.enabled());
    }

    #[test]
    fn params_are_replaced_wholesale() {
        let c = control(true);
        let mut params = c.ema_params();
        params.v_max = 900.0;
        c.set_ema_params(params);
        assert_eq!(c.ema_params().v_max, 900.0);

        let tremor = TremorParams {
            jitter_deadzone_px: 3.0,
            ..c.tremor_params()
        };
        c.set_tremor_params(tremor);
        assert_eq!(c.tremor_params(), tremor);
    }
}
