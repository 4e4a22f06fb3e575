//! The hook thread and the pieces `run` and `calibrate` share.
//!
//! A low-level hook is serviced by the thread that installed it, and only
//! while that thread pumps messages. Everything OS-bound therefore lives on
//! one dedicated thread; the async side talks to it through
//! [`EngineControl`] and a [`QuitHandle`].

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use steadyhand_common::config::AppConfig;
use steadyhand_common::error::{SteadyError, SteadyResult};
use steadyhand_hook_engine::{EngineControl, HookDispatcher};
use steadyhand_platform_core::{FunctionKey, HotkeyAction};
use steadyhand_platform_windows::{
    run_message_loop, HotkeySet, MouseHook, QuitHandle, SendInputInjector,
};
use tokio::sync::oneshot;

/// Load the configuration; every command treats failure as fatal.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load_from(path).with_context(|| {
        format!(
            "could not load configuration from {} (create one with `steadyhand config init`)",
            path.display()
        )
    })
}

/// Parse the configured toggle and quit keys.
pub fn hotkeys(config: &AppConfig) -> anyhow::Result<(FunctionKey, FunctionKey)> {
    Ok((
        FunctionKey::parse(&config.hotkey_toggle)?,
        FunctionKey::parse(&config.hotkey_quit)?,
    ))
}

/// Releases engine state when the hook thread unwinds, before hotkeys and
/// the hook itself are torn down.
struct ReleaseOnExit(Arc<EngineControl>);

impl Drop for ReleaseOnExit {
    fn drop(&mut self) {
        self.0.release_for_shutdown();
    }
}

pub struct HookThread {
    quit: QuitHandle,
    exited: oneshot::Receiver<SteadyResult<()>>,
    finished: bool,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl HookThread {
    /// Start the hook thread and wait until the hook (and hotkeys, if any)
    /// are registered.
    pub async fn spawn(
        config: &AppConfig,
        control: Arc<EngineControl>,
        hotkeys: Option<(FunctionKey, FunctionKey)>,
    ) -> anyhow::Result<Self> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (exit_tx, mut exit_rx) = oneshot::channel();
        let config = config.clone();

        let thread = std::thread::Builder::new()
            .name("steadyhand-hook".to_string())
            .spawn(move || {
                let result = hook_thread_main(&config, control, hotkeys, ready_tx);
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Hook thread failed");
                }
                let _ = exit_tx.send(result);
            })
            .context("failed to spawn hook thread")?;

        match ready_rx.await {
            Ok(quit) => Ok(Self {
                quit,
                exited: exit_rx,
                finished: false,
                thread: Some(thread),
            }),
            Err(_) => {
                let _ = thread.join();
                match exit_rx.try_recv() {
                    Ok(Err(e)) => Err(e.into()),
                    _ => Err(anyhow::anyhow!("hook thread exited during startup")),
                }
            }
        }
    }

    /// Resolves when the message loop ends on its own (quit hotkey or error).
    ///
    /// Call at most once.
    pub async fn exited(&mut self) -> SteadyResult<()> {
        let reported = (&mut self.exited).await;
        self.finished = true;
        match reported {
            Ok(result) => result,
            Err(_) => Err(SteadyError::hook("hook thread ended without reporting")),
        }
    }

    /// Ask the message loop to stop and wait for teardown to finish.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if !self.finished {
            if let Err(e) = self.quit.post() {
                tracing::warn!(error = %e, "Could not signal hook thread");
            }
        }
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .context("hook thread join task failed")?
                .map_err(|_| anyhow::anyhow!("hook thread panicked"))?;
        }
        Ok(())
    }
}

fn hook_thread_main(
    config: &AppConfig,
    control: Arc<EngineControl>,
    hotkeys: Option<(FunctionKey, FunctionKey)>,
    ready: oneshot::Sender<QuitHandle>,
) -> SteadyResult<()> {
    let mut dispatcher =
        HookDispatcher::from_config(Arc::clone(&control), SendInputInjector::new(), config);

    // Dropped in reverse: release state, unregister hotkeys, remove the hook.
    let _hook = MouseHook::install(Box::new(move |event| dispatcher.on_motion(event)))?;
    let _hotkeys = hotkeys
        .map(|(toggle, quit)| HotkeySet::register(toggle, quit))
        .transpose()?;
    let _release = ReleaseOnExit(Arc::clone(&control));

    if ready.send(QuitHandle::for_current_thread()).is_err() {
        return Ok(());
    }

    run_message_loop(|action| match action {
        HotkeyAction::ToggleSmoothing => {
            let enabled = control.toggle_user_enabled();
            tracing::info!(
                enabled,
                user_enabled = control.user_enabled(),
                "Smoothing toggled"
            );
            println!("Smoothing {}", if enabled { "ON" } else { "OFF" });
            ControlFlow::Continue(())
        }
        HotkeyAction::Quit => {
            tracing::info!("Quit hotkey pressed");
            ControlFlow::Break(())
        }
    })
}
