//! Adaptive exponential smoothing of pointer deltas.
//!
//! Slow motion gets a small alpha (heavy smoothing, tremor is slow and
//! small), fast motion a large one (intentional flicks stay responsive).
//! Alpha is interpolated linearly between the two speed thresholds.

use serde::{Deserialize, Serialize};
use steadyhand_common::config::AppConfig;

use crate::magnitude;

/// Speed thresholds and the alpha range the EMA interpolates across.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaParams {
    pub v_min: f64,
    pub v_max: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
}

impl EmaParams {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            v_min: config.v_min,
            v_max: config.v_max,
            alpha_min: config.alpha_min,
            alpha_max: config.alpha_max,
        }
    }

    /// Smoothing gain for a pointer speed in px/s.
    ///
    /// A degenerate range (`v_max <= v_min`) always yields `alpha_max`.
    pub fn alpha_for_speed(&self, v: f64) -> f64 {
        if self.v_max <= self.v_min {
            return self.alpha_max;
        }
        let t = ((v - self.v_min) / (self.v_max - self.v_min)).clamp(0.0, 1.0);
        self.alpha_min + t * (self.alpha_max - self.alpha_min)
    }
}

/// Current smoothed delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    pub sx: f64,
    pub sy: f64,
    pub initialized: bool,
}

/// Stateful EMA over motion deltas.
#[derive(Debug, Clone)]
pub struct AdaptiveEma {
    params: EmaParams,
    state: FilterState,
}

impl AdaptiveEma {
    pub fn new(params: EmaParams) -> Self {
        Self {
            params,
            state: FilterState::default(),
        }
    }

    pub fn params(&self) -> &EmaParams {
        &self.params
    }

    /// Replace the parameters; the smoothed state carries over.
    pub fn set_params(&mut self, params: EmaParams) {
        self.params = params;
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Forget the smoothed value; the next update is a cold start again.
    pub fn reset(&mut self) {
        self.state = FilterState::default();
    }

    /// Feed one delta and return the smoothed delta.
    ///
    /// The first call passes its input through and seeds the state.
    /// `dt` must be positive; the dispatcher never calls with `dt <= 0`.
    pub fn update(&mut self, dx: f64, dy: f64, dt: f64, gain: f64) -> (f64, f64) {
        if !self.state.initialized {
            self.state = FilterState {
                sx: dx,
                sy: dy,
                initialized: true,
            };
            return (dx, dy);
        }

        let speed = magnitude(dx, dy) / dt;
        let alpha = self.params.alpha_for_speed(speed) * gain;

        self.state.sx = alpha * dx + (1.0 - alpha) * self.state.sx;
        self.state.sy = alpha * dy + (1.0 - alpha) * self.state.sy;

        (self.state.sx, self.state.sy)
    }
}
