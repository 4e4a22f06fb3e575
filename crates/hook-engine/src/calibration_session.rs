//! Guided calibration as an explicit state machine.
//!
//! The session walks `Intro → Slow → Interlude → Fast → Processing` and
//! finishes with an outcome. Time passes only through a [`Scheduler`], and
//! text reaches the user only through a [`CalibrationObserver`], so the
//! whole sequence runs headless in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use steadyhand_common::clock::secs_to_duration;
use steadyhand_common::config::AppConfig;
use steadyhand_filter_core::{CalibrationCollector, EmaParams, Phase};

use crate::control::{CalibrationSink, EngineControl, Mode};

const MIN_PHASE: Duration = Duration::from_secs(1);

/// Cooperative cancellation shared between the session and its driver.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Lets time pass between session states.
pub trait Scheduler {
    /// Wait for `delay` unless `cancel` fires first.
    fn wait(&mut self, delay: Duration, cancel: &CancelToken) -> WaitOutcome;
}

/// Blocks the calling thread, waking every `slice` to check for cancellation.
#[derive(Debug, Clone)]
pub struct SleepScheduler {
    slice: Duration,
}

impl SleepScheduler {
    pub fn new(slice: Duration) -> Self {
        Self { slice }
    }
}

impl Default for SleepScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl Scheduler for SleepScheduler {
    fn wait(&mut self, delay: Duration, cancel: &CancelToken) -> WaitOutcome {
        let deadline = Instant::now() + delay;
        loop {
            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::Elapsed;
            }
            std::thread::sleep(self.slice.min(deadline - now));
        }
    }
}

/// Receives the user-facing side of the session.
pub trait CalibrationObserver {
    fn instruction(&mut self, text: &str);
    fn status(&mut self, text: &str);
    fn phase_started(&mut self, _phase: Phase, _duration: Duration) {}
    fn phase_finished(&mut self, _phase: Phase, _samples: usize) {}
}

/// Delays between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationTimings {
    pub intro: Duration,
    pub slow: Duration,
    pub interlude: Duration,
    pub fast: Duration,
    pub processing: Duration,
}

impl CalibrationTimings {
    /// Phase durations are floored at one second.
    pub fn new(slow: Duration, fast: Duration) -> Self {
        Self {
            intro: Duration::from_millis(1_500),
            slow: slow.max(MIN_PHASE),
            interlude: Duration::from_secs(3),
            fast: fast.max(MIN_PHASE),
            processing: Duration::from_millis(600),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            secs_to_duration(config.calibration_slow_duration_sec),
            secs_to_duration(config.calibration_fast_duration_sec),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// New speed thresholds are live.
    Applied(EmaParams),
    /// Too few samples; parameters unchanged.
    InsufficientData,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    Intro,
    Slow,
    Interlude,
    Fast,
    Processing,
    Finished(CalibrationOutcome),
}

pub struct CalibrationSession {
    control: Arc<EngineControl>,
    collector: Arc<Mutex<CalibrationCollector>>,
    timings: CalibrationTimings,
    state: SessionState,
    cancel: CancelToken,
}

impl CalibrationSession {
    pub fn new(control: Arc<EngineControl>, timings: CalibrationTimings) -> Self {
        Self {
            control,
            collector: Arc::new(Mutex::new(CalibrationCollector::new())),
            timings,
            state: SessionState::Intro,
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sample_count(&self, phase: Phase) -> usize {
        match self.collector.lock() {
            Ok(collector) => collector.sample_count(phase),
            Err(poisoned) => poisoned.into_inner().sample_count(phase),
        }
    }

    /// Drive the session to completion.
    pub fn run<S, O>(&mut self, scheduler: &mut S, observer: &mut O) -> CalibrationOutcome
    where
        S: Scheduler,
        O: CalibrationObserver,
    {
        loop {
            if let SessionState::Finished(outcome) = self.step(scheduler, observer) {
                return outcome;
            }
        }
    }

    /// Execute the current state and move to the next one.
    pub fn step<S, O>(&mut self, scheduler: &mut S, observer: &mut O) -> SessionState
    where
        S: Scheduler,
        O: CalibrationObserver,
    {
        if self.cancel.is_cancelled() && !matches!(self.state, SessionState::Finished(_)) {
            return self.finish_cancelled(observer);
        }

        self.state = match self.state {
            SessionState::Intro => {
                observer.instruction("Welcome! Let's calibrate SteadyHand.");
                observer.status(
                    "Calibration takes about 15 seconds and tunes the filter automatically.",
                );
                self.pause_then(scheduler, self.timings.intro, SessionState::Slow)
            }
            SessionState::Slow => {
                observer.instruction("SLOW phase: move the mouse in wide circles, slowly.");
                observer.status("Keep the motion smooth; avoid jerks.");
                self.run_phase(scheduler, observer, Phase::Slow, SessionState::Interlude)
            }
            SessionState::Interlude => {
                observer.instruction("Great! Get ready for the fast phase.");
                observer.status("The next step starts in 3 seconds.");
                self.pause_then(scheduler, self.timings.interlude, SessionState::Fast)
            }
            SessionState::Fast => {
                observer.instruction(
                    "FAST phase: move the mouse quickly, like a controlled flick.",
                );
                observer.status("No need to be aggressive; quick deliberate moves are enough.");
                self.run_phase(scheduler, observer, Phase::Fast, SessionState::Processing)
            }
            SessionState::Processing => {
                observer.instruction("Processing the collected data...");
                observer.status("");
                match scheduler.wait(self.timings.processing, &self.cancel) {
                    WaitOutcome::Cancelled => SessionState::Finished(CalibrationOutcome::Cancelled),
                    WaitOutcome::Elapsed => SessionState::Finished(self.apply_results(observer)),
                }
            }
            finished @ SessionState::Finished(_) => finished,
        };

        if self.state == SessionState::Finished(CalibrationOutcome::Cancelled) {
            return self.finish_cancelled(observer);
        }
        self.state
    }

    fn pause_then<S: Scheduler>(
        &self,
        scheduler: &mut S,
        delay: Duration,
        next: SessionState,
    ) -> SessionState {
        match scheduler.wait(delay, &self.cancel) {
            WaitOutcome::Elapsed => next,
            WaitOutcome::Cancelled => SessionState::Finished(CalibrationOutcome::Cancelled),
        }
    }

    fn run_phase<S, O>(
        &self,
        scheduler: &mut S,
        observer: &mut O,
        phase: Phase,
        next: SessionState,
    ) -> SessionState
    where
        S: Scheduler,
        O: CalibrationObserver,
    {
        let duration = match phase {
            Phase::Slow => self.timings.slow,
            Phase::Fast => self.timings.fast,
        };

        let collector = Arc::clone(&self.collector);
        self.control.start_calibration(
            phase,
            CalibrationSink::new(move |phase, dx, dy, dt| {
                // Never block the hook thread; a contended sample is dropped.
                if let Ok(mut collector) = collector.try_lock() {
                    collector.record(phase, dx, dy, dt);
                }
            }),
        );
        observer.phase_started(phase, duration);

        let waited = scheduler.wait(duration, &self.cancel);

        self.control.stop_calibration();
        observer.phase_finished(phase, self.sample_count(phase));

        match waited {
            WaitOutcome::Elapsed => next,
            WaitOutcome::Cancelled => SessionState::Finished(CalibrationOutcome::Cancelled),
        }
    }

    fn apply_results<O: CalibrationObserver>(&self, observer: &mut O) -> CalibrationOutcome {
        let current = self.control.ema_params();
        let suggestion = match self.collector.lock() {
            Ok(collector) => collector.recommendations(&current),
            Err(poisoned) => poisoned.into_inner().recommendations(&current),
        };

        match suggestion {
            Some(params) => {
                self.control.set_ema_params(params);
                observer.instruction(&format!(
                    "Calibration complete!\nv_min={}, v_max={}\nalpha_min={}, alpha_max={}",
                    params.v_min, params.v_max, params.alpha_min, params.alpha_max
                ));
                observer.status("The new parameters are already active.");
                tracing::info!(
                    v_min = params.v_min,
                    v_max = params.v_max,
                    "Calibration applied"
                );
                CalibrationOutcome::Applied(params)
            }
            None => {
                observer.instruction(
                    "Calibration finished, but there was not enough data to adjust the filter.",
                );
                observer.status("Try again with more continuous movements.");
                tracing::warn!(
                    slow_samples = self.sample_count(Phase::Slow),
                    fast_samples = self.sample_count(Phase::Fast),
                    "Calibration had insufficient data"
                );
                CalibrationOutcome::InsufficientData
            }
        }
    }

    fn finish_cancelled<O: CalibrationObserver>(&mut self, observer: &mut O) -> SessionState {
        if matches!(self.control.mode(), Mode::Calibration(_)) {
            self.control.stop_calibration();
        }
        observer.status("Calibration cancelled.");
        tracing::info!("Calibration cancelled");
        self.state = SessionState::Finished(CalibrationOutcome::Cancelled);
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_floor_phase_durations() {
        let t = CalibrationTimings::new(Duration::from_millis(200), Duration::from_secs(4));
        assert_eq!(t.slow, Duration::from_secs(1));
        assert_eq!(t.fast, Duration::from_secs(4));
        assert_eq!(t.intro, Duration::from_millis(1_500));
        assert_eq!(t.interlude, Duration::from_secs(3));
        assert_eq!(t.processing, Duration::from_millis(600));
    }

    #[test]
    fn sleep_scheduler_honours_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let mut scheduler = SleepScheduler::default();
        assert_eq!(
            scheduler.wait(Duration::from_secs(60), &token),
            WaitOutcome::Cancelled
        );
    }

    #[test]
    fn sleep_scheduler_elapses() {
        let mut scheduler = SleepScheduler::new(Duration::from_millis(1));
        let started = Instant::now();
        assert_eq!(
            scheduler.wait(Duration::from_millis(5), &CancelToken::new()),
            WaitOutcome::Elapsed
        );
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
