use std::cell::RefCell;
use std::ffi::OsString;
use std::ops::ControlFlow;
use std::os::windows::ffi::OsStringExt;
use std::path::Path;

use steadyhand_common::error::{SteadyError, SteadyResult};
use steadyhand_platform_core::{
    ForegroundProbe, FunctionKey, HookDecision, HotkeyAction, InjectError, InputInjector,
    MotionEvent,
};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::{
    GetCurrentThreadId, OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_FORMAT,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, SendInput, UnregisterHotKey, INPUT, INPUT_0, INPUT_MOUSE, MOD_NOREPEAT,
    MOUSEEVENTF_MOVE, MOUSEINPUT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetForegroundWindow, GetMessageW, GetWindowThreadProcessId,
    PostThreadMessageW, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION,
    HHOOK, MSG, MSLLHOOKSTRUCT, WH_MOUSE_LL, WM_HOTKEY, WM_MOUSEMOVE, WM_QUIT,
};

use crate::MotionHandler;

thread_local! {
    // Low-level hooks are called on the installing thread, so the handler
    // never crosses threads and needs no lock.
    static HANDLER: RefCell<Option<MotionHandler>> = const { RefCell::new(None) };
}

fn dispatch(event: MotionEvent) -> HookDecision {
    HANDLER.with(|slot| match slot.try_borrow_mut() {
        Ok(mut handler) => match handler.as_mut() {
            Some(handler) => handler(event),
            None => HookDecision::PassThrough,
        },
        // Re-entrant delivery while the handler is running.
        Err(_) => HookDecision::PassThrough,
    })
}

unsafe extern "system" fn hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        if code != HC_ACTION as i32 || wparam.0 as u32 != WM_MOUSEMOVE {
            return HookDecision::PassThrough;
        }
        let data = &*(lparam.0 as *const MSLLHOOKSTRUCT);
        dispatch(MotionEvent::new(data.pt.x, data.pt.y, data.dwExtraInfo))
    }));

    match result {
        Ok(HookDecision::Suppress) => LRESULT(1),
        Ok(HookDecision::PassThrough) => CallNextHookEx(None, code, wparam, lparam),
        Err(panic) => {
            let message = if let Some(message) = panic.downcast_ref::<&str>() {
                (*message).to_string()
            } else if let Some(message) = panic.downcast_ref::<String>() {
                message.clone()
            } else {
                "unknown panic".to_string()
            };
            tracing::error!(error = %message, "Mouse hook handler panicked");
            CallNextHookEx(None, code, wparam, lparam)
        }
    }
}

/// An installed `WH_MOUSE_LL` hook.
///
/// Must be installed and dropped on the thread that runs
/// [`run_message_loop`]; the OS only calls the hook while that thread pumps.
pub struct MouseHook {
    hook: Option<HHOOK>,
}

impl MouseHook {
    pub fn install(handler: MotionHandler) -> SteadyResult<Self> {
        if HANDLER.with(|slot| slot.borrow().is_some()) {
            return Err(SteadyError::hook(
                "a mouse hook is already installed on this thread",
            ));
        }
        HANDLER.with(|slot| *slot.borrow_mut() = Some(handler));

        match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(hook_proc), None, 0) } {
            Ok(hook) => {
                tracing::info!("Low-level mouse hook installed");
                Ok(Self { hook: Some(hook) })
            }
            Err(e) => {
                HANDLER.with(|slot| slot.borrow_mut().take());
                Err(SteadyError::hook(format!("SetWindowsHookExW failed: {e}")))
            }
        }
    }

    pub fn is_installed(&self) -> bool {
        self.hook.is_some()
    }

    /// Remove the hook and drop the handler. Safe to call twice.
    pub fn uninstall(&mut self) {
        let Some(hook) = self.hook.take() else {
            return;
        };
        if let Err(e) = unsafe { UnhookWindowsHookEx(hook) } {
            tracing::warn!(error = %e, "UnhookWindowsHookEx failed");
        }
        let handler = HANDLER.with(|slot| slot.try_borrow_mut().ok().and_then(|mut s| s.take()));
        drop(handler);
        tracing::info!("Low-level mouse hook removed");
    }
}

impl Drop for MouseHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Relative motion through `SendInput`, tagged via `dwExtraInfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputInjector;

impl SendInputInjector {
    pub fn new() -> Self {
        Self
    }
}

impl InputInjector for SendInputInjector {
    fn inject(&mut self, dx: i32, dy: i32, tag: usize) -> Result<(), InjectError> {
        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
                    dwFlags: MOUSEEVENTF_MOVE,
                    time: 0,
                    dwExtraInfo: tag,
                },
            },
        };
        let inserted = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if inserted == 1 {
            Ok(())
        } else {
            Err(InjectError::Rejected { inserted })
        }
    }

    fn name(&self) -> &str {
        "sendinput"
    }
}

/// Toggle and quit hotkeys bound to the calling thread's message queue.
///
/// Dropping the set unregisters whatever was registered.
#[derive(Debug)]
pub struct HotkeySet {
    registered: Vec<HotkeyAction>,
}

impl HotkeySet {
    /// Register both keys or neither.
    pub fn register(toggle: FunctionKey, quit: FunctionKey) -> SteadyResult<Self> {
        let mut set = Self {
            registered: Vec::with_capacity(2),
        };
        for (action, key) in [
            (HotkeyAction::ToggleSmoothing, toggle),
            (HotkeyAction::Quit, quit),
        ] {
            unsafe {
                RegisterHotKey(HWND::default(), action.id(), MOD_NOREPEAT, key.virtual_key_code())
            }
            .map_err(|e| SteadyError::hotkey(format!("could not register {key}: {e}")))?;
            set.registered.push(action);
            tracing::debug!(%key, ?action, "Hotkey registered");
        }
        Ok(set)
    }
}

impl Drop for HotkeySet {
    fn drop(&mut self) {
        for action in self.registered.drain(..) {
            if let Err(e) = unsafe { UnregisterHotKey(HWND::default(), action.id()) } {
                tracing::warn!(error = %e, ?action, "UnregisterHotKey failed");
            }
        }
    }
}

/// Pump the calling thread's messages until `WM_QUIT` or until
/// `on_hotkey` breaks.
pub fn run_message_loop<F>(mut on_hotkey: F) -> SteadyResult<()>
where
    F: FnMut(HotkeyAction) -> ControlFlow<()>,
{
    let mut msg = MSG::default();
    loop {
        let result = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
        match result.0 {
            -1 => return Err(SteadyError::platform("GetMessageW failed")),
            0 => return Ok(()),
            _ => {}
        }

        if msg.message == WM_HOTKEY {
            if let Some(action) = HotkeyAction::from_id(msg.wParam.0 as i32) {
                if on_hotkey(action).is_break() {
                    return Ok(());
                }
            }
            continue;
        }

        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Ends [`run_message_loop`] on another thread.
#[derive(Debug, Clone, Copy)]
pub struct QuitHandle {
    thread_id: u32,
}

impl QuitHandle {
    /// Create after the thread has a message queue (installing the hook
    /// or registering hotkeys creates one).
    pub fn for_current_thread() -> Self {
        Self {
            thread_id: unsafe { GetCurrentThreadId() },
        }
    }

    pub fn post(&self) -> SteadyResult<()> {
        unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }.map_err(
            |e| {
                SteadyError::platform(format!(
                    "could not post WM_QUIT to thread {}: {e}",
                    self.thread_id
                ))
            },
        )
    }
}

/// Foreground window process lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForegroundProcess;

impl ForegroundProbe for ForegroundProcess {
    fn foreground_process_name(&self) -> SteadyResult<Option<String>> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0.is_null() {
                return Ok(None);
            }

            let mut pid = 0u32;
            let _ = GetWindowThreadProcessId(hwnd, Some(&mut pid));
            if pid == 0 {
                return Ok(None);
            }

            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid)
                .map_err(|e| SteadyError::platform(format!("OpenProcess({pid}) failed: {e}")))?;
            let mut buffer = vec![0u16; 1024];
            let mut size = buffer.len() as u32;
            let queried = QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_FORMAT(0),
                PWSTR(buffer.as_mut_ptr()),
                &mut size,
            );
            let _ = CloseHandle(handle);
            queried.map_err(|e| {
                SteadyError::platform(format!("QueryFullProcessImageNameW({pid}) failed: {e}"))
            })?;

            let path = OsString::from_wide(&buffer[..size as usize]);
            Ok(Path::new(&path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()))
        }
    }
}
