//! In-process injectors for tests and dry runs.

use steadyhand_platform_core::{InjectError, InputInjector};

/// A synthetic move as it would have been placed in the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedMove {
    pub dx: i32,
    pub dy: i32,
    pub tag: usize,
}

/// Records every injection instead of performing it.
#[derive(Debug, Default)]
pub struct RecordingInjector {
    moves: Vec<InjectedMove>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves(&self) -> &[InjectedMove] {
        &self.moves
    }
}

impl InputInjector for RecordingInjector {
    fn inject(&mut self, dx: i32, dy: i32, tag: usize) -> Result<(), InjectError> {
        self.moves.push(InjectedMove { dx, dy, tag });
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Rejects every injection, as a saturated or blocked input stream would.
#[derive(Debug, Default)]
pub struct FailingInjector {
    attempts: u64,
}

impl FailingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }
}

impl InputInjector for FailingInjector {
    fn inject(&mut self, _dx: i32, _dy: i32, _tag: usize) -> Result<(), InjectError> {
        self.attempts += 1;
        Err(InjectError::Rejected { inserted: 0 })
    }

    fn name(&self) -> &str {
        "failing"
    }
}
