//! Tremor pre-filter.
//!
//! Runs before the adaptive EMA and acts in two independent ways:
//! a deadzone that zeroes short, slow motion (jitter), and a gain below one
//! for very slow motion so the EMA smooths it harder.

use serde::{Deserialize, Serialize};
use steadyhand_common::config::AppConfig;

use crate::magnitude;

/// Speed (px/s) under which the extra damping gain applies. Not configurable.
pub const EXTRA_DAMP_SPEED: f64 = 50.0;

/// Tremor guard parameters. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TremorParams {
    pub jitter_deadzone_px: f64,
    pub jitter_speed_max: f64,
    pub extra_damp_factor: f64,
}

impl TremorParams {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            jitter_deadzone_px: config.jitter_deadzone_px,
            jitter_speed_max: config.jitter_speed_max,
            extra_damp_factor: config.extra_damp_factor,
        }
    }
}

/// Stateless tremor pre-filter.
#[derive(Debug, Clone, Copy)]
pub struct TremorGuard {
    params: TremorParams,
}

impl TremorGuard {
    pub fn new(params: TremorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TremorParams {
        &self.params
    }

    pub fn set_params(&mut self, params: TremorParams) {
        self.params = params;
    }

    /// Returns the (possibly zeroed) delta and the gain to apply to the EMA alpha.
    ///
    /// A non-positive `dt` leaves the delta untouched with a gain of one.
    pub fn preprocess(&self, dx: f64, dy: f64, dt: f64) -> (f64, f64, f64) {
        if dt <= 0.0 {
            return (dx, dy, 1.0);
        }

        let distance = magnitude(dx, dy);
        let speed = distance / dt;

        let (dx, dy) = if speed < self.params.jitter_speed_max
            && distance < self.params.jitter_deadzone_px
        {
            (0.0, 0.0)
        } else {
            (dx, dy)
        };

        let gain = if speed < EXTRA_DAMP_SPEED {
            1.0 - self.params.extra_damp_factor
        } else {
            1.0
        };

        (dx, dy, gain)
    }
}
