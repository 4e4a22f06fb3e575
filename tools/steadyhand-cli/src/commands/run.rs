//! Run the smoothing engine until the quit hotkey or Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use steadyhand_common::clock::secs_to_duration;
use steadyhand_hook_engine::{
    BlacklistMonitor, CalibrationSession, CalibrationTimings, EngineControl,
};
use steadyhand_platform_windows::ForegroundProcess;
use tokio::sync::watch;

use crate::commands::calibrate;
use crate::engine::{self, HookThread};

pub async fn run(config_path: PathBuf, calibrate_first: bool) -> anyhow::Result<()> {
    let config = engine::load_config(&config_path)?;
    let (toggle, quit) = engine::hotkeys(&config)?;
    let control = EngineControl::from_config(&config);

    let mut hook = HookThread::spawn(&config, Arc::clone(&control), Some((toggle, quit))).await?;
    tracing::info!(
        config = %config_path.display(),
        enabled = control.enabled(),
        "Engine started"
    );
    println!("SteadyHand is running.");
    println!("  {toggle}: toggle smoothing");
    println!("  {quit}: quit (or press Ctrl+C)");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let blacklist = tokio::spawn(
        BlacklistMonitor::new(Arc::clone(&control), config.blacklist.as_slice()).run(
            Arc::new(ForegroundProcess),
            secs_to_duration(config.blacklist_poll_interval_sec),
            shutdown_rx,
        ),
    );

    let calibration = (calibrate_first || config.run_calibration_on_start).then(|| {
        let session = CalibrationSession::new(
            Arc::clone(&control),
            CalibrationTimings::from_config(&config),
        );
        let cancel = session.cancel_token();
        (cancel, calibrate::spawn_session(session))
    });

    let stopped = tokio::select! {
        result = hook.exited() => result.map_err(anyhow::Error::from),
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received");
            signal.map_err(anyhow::Error::from)
        }
    };
    control.release_for_shutdown();

    if let Some((cancel, task)) = calibration {
        cancel.cancel();
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Calibration task failed");
        }
    }
    let _ = shutdown_tx.send(true);
    if let Err(e) = blacklist.await {
        tracing::warn!(error = %e, "Blacklist monitor task failed");
    }
    hook.shutdown().await?;

    println!("SteadyHand stopped.");
    stopped
}
