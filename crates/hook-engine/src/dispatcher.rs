//! Per-event dispatch: the code that runs inside the OS hook callback.
//!
//! Each raw motion sample is turned into a delta against the previous one
//! and routed either to the calibration sink or through
//! tremor guard → adaptive EMA → synthetic injection. Events carrying the
//! magic tag are our own injected output and are never touched.

use std::sync::Arc;
use std::time::Instant;

use steadyhand_common::clock::{secs_to_duration, MonotonicClock};
use steadyhand_common::config::AppConfig;
use steadyhand_filter_core::{AdaptiveEma, TremorGuard};
use steadyhand_platform_core::{HookDecision, InjectError, InputInjector, MotionEvent};

use crate::control::{EngineControl, Mode};
use crate::profiler::LatencyProfiler;

/// A raw pointer position with its monotonic timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

/// Failures inside the per-event step. All of them resolve fail-open.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("synthetic move ({dx}, {dy}) was not injected: {source}")]
    Injection {
        dx: i32,
        dy: i32,
        #[source]
        source: InjectError,
    },

    #[error("filter produced a non-finite delta ({sx}, {sy})")]
    NonFinite { sx: f64, sy: f64 },
}

/// Counters kept for the shutdown report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub own_events: u64,
    pub calibration_samples: u64,
    pub injected: u64,
    pub suppressed: u64,
    pub failures: u64,
}

struct Step {
    decision: HookDecision,
    measured: bool,
}

impl Step {
    fn pass() -> Self {
        Self {
            decision: HookDecision::PassThrough,
            measured: false,
        }
    }
}

/// Owned by the hook thread; never shared.
pub struct HookDispatcher<I: InputInjector> {
    control: Arc<EngineControl>,
    tremor: TremorGuard,
    ema: AdaptiveEma,
    profiler: LatencyProfiler,
    injector: I,
    magic: usize,
    clock: MonotonicClock,
    last_sample: Option<MotionSample>,
    seen_epoch: u64,
    stats: DispatchStats,
}

impl<I: InputInjector> HookDispatcher<I> {
    pub fn new(
        control: Arc<EngineControl>,
        injector: I,
        magic: usize,
        profiler: LatencyProfiler,
    ) -> Self {
        let tremor = TremorGuard::new(control.tremor_params());
        let ema = AdaptiveEma::new(control.ema_params());
        let seen_epoch = control.sample_epoch();
        Self {
            control,
            tremor,
            ema,
            profiler,
            injector,
            magic,
            clock: MonotonicClock::start(),
            last_sample: None,
            seen_epoch,
            stats: DispatchStats::default(),
        }
    }

    pub fn from_config(control: Arc<EngineControl>, injector: I, config: &AppConfig) -> Self {
        let profiler = LatencyProfiler::new(secs_to_duration(config.profiler_log_interval_sec));
        Self::new(control, injector, config.magic_tag(), profiler)
    }

    /// Entry point for platform hooks: stamps the event with the engine clock.
    pub fn on_motion(&mut self, event: MotionEvent) -> HookDecision {
        let t = self.clock.now_secs();
        self.on_event(f64::from(event.x), f64::from(event.y), t, event.tag)
    }

    /// Process one raw sample and decide the fate of the real event.
    ///
    /// Never fails: any internal error is logged and the real event is
    /// forwarded untouched.
    pub fn on_event(&mut self, x: f64, y: f64, t: f64, tag: usize) -> HookDecision {
        let started = Instant::now();
        self.stats.received += 1;

        match self.process(x, y, t, tag) {
            Ok(step) => {
                if step.measured {
                    self.profiler.log(started.elapsed());
                }
                if step.decision.is_suppressed() {
                    self.stats.suppressed += 1;
                }
                step.decision
            }
            Err(err) => {
                self.stats.failures += 1;
                tracing::warn!(error = %err, "Hook processing failed; forwarding real event");
                HookDecision::PassThrough
            }
        }
    }

    fn process(&mut self, x: f64, y: f64, t: f64, tag: usize) -> Result<Step, HookError> {
        if tag == self.magic {
            self.stats.own_events += 1;
            return Ok(Step::pass());
        }

        // Mode first: a transition bumps the epoch before publishing the mode.
        let mode = self.control.mode();
        let enabled = self.control.enabled_in(mode);

        let epoch = self.control.sample_epoch();
        if epoch != self.seen_epoch {
            self.seen_epoch = epoch;
            self.last_sample = None;
        }

        let Some(last) = self.last_sample.replace(MotionSample { x, y, t }) else {
            return Ok(Step::pass());
        };

        let dx = x - last.x;
        let dy = y - last.y;
        let dt = t - last.t;

        if dt.is_nan() || dt <= 0.0 {
            return Ok(Step {
                decision: if enabled {
                    HookDecision::Suppress
                } else {
                    HookDecision::PassThrough
                },
                measured: enabled,
            });
        }

        if let Mode::Calibration(phase) = mode {
            if let Some(sink) = self.control.calibration_sink() {
                sink.record(phase, dx, dy, dt);
                self.stats.calibration_samples += 1;
            }
            return Ok(Step::pass());
        }

        if !enabled {
            return Ok(Step::pass());
        }

        self.tremor.set_params(self.control.tremor_params());
        let (dx, dy, gain) = self.tremor.preprocess(dx, dy, dt);

        self.ema.set_params(self.control.ema_params());
        let (sx, sy) = self.ema.update(dx, dy, dt, gain);
        if !sx.is_finite() || !sy.is_finite() {
            self.ema.reset();
            return Err(HookError::NonFinite { sx, sy });
        }

        if sx != 0.0 || sy != 0.0 {
            let (ix, iy) = (sx.round_ties_even() as i32, sy.round_ties_even() as i32);
            self.injector
                .inject(ix, iy, self.magic)
                .map_err(|source| HookError::Injection {
                    dx: ix,
                    dy: iy,
                    source,
                })?;
            self.stats.injected += 1;
        }

        Ok(Step {
            decision: HookDecision::Suppress,
            measured: true,
        })
    }

    pub fn control(&self) -> &Arc<EngineControl> {
        &self.control
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn ema(&self) -> &AdaptiveEma {
        &self.ema
    }

    pub fn profiler(&self) -> &LatencyProfiler {
        &self.profiler
    }

    pub fn last_sample(&self) -> Option<MotionSample> {
        self.last_sample
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}

impl<I: InputInjector> Drop for HookDispatcher<I> {
    fn drop(&mut self) {
        let stats = self.stats;
        tracing::info!(
            injector = %self.injector.name(),
            received = stats.received,
            injected = stats.injected,
            suppressed = stats.suppressed,
            own_events = stats.own_events,
            calibration_samples = stats.calibration_samples,
            failures = stats.failures,
            "Hook dispatcher stopped"
        );
    }
}
