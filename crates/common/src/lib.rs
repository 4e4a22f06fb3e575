//! SteadyHand Common Utilities
//!
//! Shared infrastructure for all SteadyHand crates:
//! - Error types and result aliases
//! - Monotonic clock for event timestamps and latency measurement
//! - Tracing/logging initialization
//! - Configuration loading and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
