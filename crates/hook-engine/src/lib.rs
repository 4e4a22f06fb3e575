//! SteadyHand Hook Engine
//!
//! Everything between the OS hook callback and the filter:
//!
//! - **Control:** lock-free mode, pause and enable state shared across threads
//! - **Dispatcher:** the per-event step run on the hook thread
//! - **Profiler:** aggregated per-event latency
//! - **Calibration session:** the guided slow/fast sequence
//! - **Blacklist:** pauses smoothing while listed processes own the foreground
//!
//! Platform backends plug in through the `steadyhand-platform-core` traits.

pub mod blacklist;
pub mod calibration_session;
pub mod control;
pub mod dispatcher;
pub mod injectors;
pub mod profiler;

pub use blacklist::BlacklistMonitor;
pub use calibration_session::{
    CalibrationObserver, CalibrationOutcome, CalibrationSession, CalibrationTimings, CancelToken,
    Scheduler, SessionState, SleepScheduler, WaitOutcome,
};
pub use control::{CalibrationSink, EngineControl, Mode, PauseReason};
pub use dispatcher::{DispatchStats, HookDispatcher, HookError, MotionSample};
pub use injectors::{FailingInjector, InjectedMove, RecordingInjector};
pub use profiler::{LatencyProfiler, LatencySummary};
