//! SteadyHand Filter Core
//!
//! The two-stage motion filter and its calibration statistics:
//! - **Tremor Guard:** deadzone for low-amplitude jitter plus extra damping of very slow motion
//! - **Adaptive EMA:** exponential smoothing whose gain follows pointer speed
//! - **Calibration:** phase-tagged speed samples turned into EMA speed thresholds
//!
//! This crate is pure computation, no I/O, no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod calibration;
pub mod smoothing;
pub mod tremor;

pub use calibration::{percentile, CalibrationCollector, Phase};
pub use smoothing::{AdaptiveEma, EmaParams};
pub use tremor::{TremorGuard, TremorParams};

/// Euclidean length of a motion delta.
#[inline]
pub(crate) fn magnitude(dx: f64, dy: f64) -> f64 {
    dx.hypot(dy)
}
