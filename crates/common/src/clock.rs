//! Clock and timing utilities for the event pipeline.
//!
//! Every motion sample is stamped against a monotonic epoch recorded when
//! the engine starts. The free functions convert configured seconds and
//! measured latencies.

use std::time::{Duration, Instant};

/// A monotonic clock that provides timestamps relative to a fixed epoch
/// (the moment the engine started).
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Seconds elapsed since the epoch. This is the `t` of a motion sample.
    pub fn now_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Duration expressed as fractional microseconds, the unit latency is reported in.
pub fn duration_micros(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000_000.0
}

/// Clamp a configured seconds value into a `Duration`, treating
/// non-finite or negative input as zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
