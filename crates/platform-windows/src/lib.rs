//! Windows platform backend.
//!
//! - **Mouse hook:** `WH_MOUSE_LL` with the handler on the installing thread
//! - **Injection:** relative `SendInput` moves tagged through `dwExtraInfo`
//! - **Hotkeys:** thread-bound `RegisterHotKey` pairs
//! - **Message loop:** `GetMessageW` pump that also delivers hotkeys
//! - **Foreground:** executable name of the foreground window's process
//!
//! On other targets every entry point reports
//! [`SteadyError::Unsupported`](steadyhand_common::error::SteadyError::Unsupported),
//! so the rest of the workspace builds and tests everywhere.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::*;

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use unsupported::*;

/// Handler invoked on the hook thread for every real or injected move.
pub type MotionHandler =
    Box<dyn FnMut(steadyhand_platform_core::MotionEvent) -> steadyhand_platform_core::HookDecision>;

/// Whether this build can install hooks at all.
pub fn is_supported() -> bool {
    cfg!(windows)
}
