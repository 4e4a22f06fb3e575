//! SteadyHand platform core contracts.
//!
//! This crate contains the OS-neutral types exchanged between the hook
//! engine and a concrete platform backend: what a low-level hook delivers,
//! what it must answer, how synthetic motion is injected, and how hotkeys
//! and the foreground process are described.

use serde::{Deserialize, Serialize};
use steadyhand_common::config::function_key_number;
use steadyhand_common::error::{SteadyError, SteadyResult};

/// A raw pointer-move event as delivered by a low-level hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    /// Absolute screen X in pixels.
    pub x: i32,
    /// Absolute screen Y in pixels.
    pub y: i32,
    /// Opaque per-event tag (`dwExtraInfo` on Windows). Zero for real input.
    pub tag: usize,
}

impl MotionEvent {
    pub fn new(x: i32, y: i32, tag: usize) -> Self {
        Self { x, y, tag }
    }
}

/// What the hook tells the OS to do with the real event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookDecision {
    /// Forward the event unmodified to the next handler in the chain.
    PassThrough,
    /// Swallow the event; downstream consumers never see it.
    Suppress,
}

impl HookDecision {
    pub fn is_suppressed(self) -> bool {
        matches!(self, HookDecision::Suppress)
    }
}

/// Failure to place a synthetic event into the system input stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    #[error("input stream accepted {inserted} of 1 events")]
    Rejected { inserted: u32 },

    #[error("input injection is not supported on this platform")]
    Unsupported,
}

/// Places relative-motion events into the input stream the hook observes.
///
/// Called inline from the hook thread, so implementations must not block.
pub trait InputInjector: Send {
    /// Inject one relative move of `(dx, dy)` carrying `tag`.
    fn inject(&mut self, dx: i32, dy: i32, tag: usize) -> Result<(), InjectError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

impl<T: InputInjector + ?Sized> InputInjector for Box<T> {
    fn inject(&mut self, dx: i32, dy: i32, tag: usize) -> Result<(), InjectError> {
        (**self).inject(dx, dy, tag)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Reports which process owns the foreground window.
pub trait ForegroundProbe: Send + Sync {
    /// Executable name (basename, e.g. `game.exe`) of the foreground
    /// window's process, or `None` when there is no foreground window.
    fn foreground_process_name(&self) -> SteadyResult<Option<String>>;
}

/// A function key usable as a global hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionKey(u8);

impl FunctionKey {
    /// Parse "F1".."F24" (case-insensitive).
    pub fn parse(name: &str) -> SteadyResult<Self> {
        function_key_number(name)
            .map(FunctionKey)
            .ok_or_else(|| SteadyError::hotkey(format!("unsupported hotkey '{name}'")))
    }

    /// Key number, 1-based.
    pub fn number(self) -> u8 {
        self.0
    }

    /// Windows virtual-key code (`VK_F1` is 0x70, contiguous to `VK_F24`).
    pub fn virtual_key_code(self) -> u32 {
        0x70 + u32::from(self.0) - 1
    }
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// The actions bound to global hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    ToggleSmoothing,
    Quit,
}

impl HotkeyAction {
    /// Registration id used with the OS hotkey table.
    pub fn id(self) -> i32 {
        match self {
            HotkeyAction::ToggleSmoothing => 1,
            HotkeyAction::Quit => 2,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(HotkeyAction::ToggleSmoothing),
            2 => Some(HotkeyAction::Quit),
            _ => None,
        }
    }
}

/// Strip directories and compare process names case-insensitively,
/// ignoring a trailing `.exe`.
pub fn normalize_process_name(name: &str) -> String {
    let base = name.rsplit(['\\', '/']).next().unwrap_or(name).trim();
    let lower = base.to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}
