//! Calibration statistics.
//!
//! During calibration the user moves the pointer deliberately slow, then
//! deliberately fast. Each phase's speeds land in their own bucket; the
//! percentiles of the two buckets become the EMA speed thresholds.

use serde::{Deserialize, Serialize};

use crate::magnitude;
use crate::smoothing::EmaParams;

/// Samples each phase needs before recommendations are produced.
pub const MIN_SAMPLES_PER_PHASE: usize = 25;

/// Calibration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Slow,
    Fast,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Slow, Phase::Fast];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Slow => "slow",
            Phase::Fast => "fast",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase-keyed speed samples. Cleared only by creating a new collector.
#[derive(Debug, Clone, Default)]
pub struct CalibrationCollector {
    slow: Vec<f64>,
    fast: Vec<f64>,
}

impl CalibrationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the speed of one delta. Ignored when `dt <= 0`.
    pub fn record(&mut self, phase: Phase, dx: f64, dy: f64, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let speed = magnitude(dx, dy) / dt;
        self.bucket_mut(phase).push(speed);
    }

    pub fn sample_count(&self, phase: Phase) -> usize {
        self.bucket(phase).len()
    }

    /// Every phase bucket holds at least [`MIN_SAMPLES_PER_PHASE`] samples.
    pub fn has_enough_data(&self) -> bool {
        Phase::ALL
            .iter()
            .all(|&phase| self.sample_count(phase) >= MIN_SAMPLES_PER_PHASE)
    }

    /// Derive new speed thresholds; the alpha range is carried over unchanged.
    pub fn recommendations(&self, current: &EmaParams) -> Option<EmaParams> {
        if !self.has_enough_data() {
            return None;
        }

        let slow = sorted(&self.slow);
        let fast = sorted(&self.fast);
        if slow.is_empty() || fast.is_empty() {
            return None;
        }

        let v_min = (percentile(&slow, 0.65) * 0.75).max(10.0);
        let v_max = (v_min + 120.0)
            .max(percentile(&fast, 0.90) * 1.1)
            .max(percentile(&fast, 0.50) * 1.3);

        let recommended = EmaParams {
            v_min: round_to(v_min, 2),
            v_max: round_to(v_max, 2),
            alpha_min: round_to(current.alpha_min, 4),
            alpha_max: round_to(current.alpha_max, 4),
        };
        tracing::debug!(
            slow_samples = slow.len(),
            fast_samples = fast.len(),
            v_min = recommended.v_min,
            v_max = recommended.v_max,
            "Calibration recommendations computed"
        );
        Some(recommended)
    }

    fn bucket(&self, phase: Phase) -> &[f64] {
        match phase {
            Phase::Slow => &self.slow,
            Phase::Fast => &self.fast,
        }
    }

    fn bucket_mut(&mut self, phase: Phase) -> &mut Vec<f64> {
        match phase {
            Phase::Slow => &mut self.slow,
            Phase::Fast => &mut self.fast,
        }
    }
}

/// Nearest-rank percentile over an ascending slice.
///
/// `fraction` is clamped to `[0, 1]`; the index is `(n - 1) * fraction`
/// rounded half to even. An empty slice yields `0.0`.
pub fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let fraction = fraction.clamp(0.0, 1.0);
    let index = ((sorted.len() - 1) as f64 * fraction).round_ties_even() as usize;
    sorted[index.min(sorted.len() - 1)]
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
