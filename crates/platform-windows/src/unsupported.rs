use std::ops::ControlFlow;

use steadyhand_common::error::{SteadyError, SteadyResult};
use steadyhand_platform_core::{
    ForegroundProbe, FunctionKey, HotkeyAction, InjectError, InputInjector,
};

use crate::MotionHandler;

fn unsupported(what: &str) -> SteadyError {
    SteadyError::unsupported(format!("{what} requires Windows"))
}

pub struct MouseHook {
    _private: (),
}

impl MouseHook {
    pub fn install(_handler: MotionHandler) -> SteadyResult<Self> {
        Err(unsupported("the low-level mouse hook"))
    }

    pub fn is_installed(&self) -> bool {
        false
    }

    pub fn uninstall(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputInjector;

impl SendInputInjector {
    pub fn new() -> Self {
        Self
    }
}

impl InputInjector for SendInputInjector {
    fn inject(&mut self, _dx: i32, _dy: i32, _tag: usize) -> Result<(), InjectError> {
        Err(InjectError::Unsupported)
    }

    fn name(&self) -> &str {
        "sendinput"
    }
}

#[derive(Debug)]
pub struct HotkeySet {
    _private: (),
}

impl HotkeySet {
    pub fn register(_toggle: FunctionKey, _quit: FunctionKey) -> SteadyResult<Self> {
        Err(unsupported("global hotkeys"))
    }
}

pub fn run_message_loop<F>(_on_hotkey: F) -> SteadyResult<()>
where
    F: FnMut(HotkeyAction) -> ControlFlow<()>,
{
    Err(unsupported("the message loop"))
}

#[derive(Debug, Clone, Copy)]
pub struct QuitHandle {
    _private: (),
}

impl QuitHandle {
    pub fn for_current_thread() -> Self {
        Self { _private: () }
    }

    pub fn post(&self) -> SteadyResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ForegroundProcess;

impl ForegroundProbe for ForegroundProcess {
    fn foreground_process_name(&self) -> SteadyResult<Option<String>> {
        Err(unsupported("foreground process lookup"))
    }
}
