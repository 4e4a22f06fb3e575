//! Guided calibration without smoothing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use steadyhand_filter_core::{EmaParams, Phase};
use steadyhand_hook_engine::{
    CalibrationObserver, CalibrationOutcome, CalibrationSession, CalibrationTimings,
    EngineControl, SleepScheduler,
};

use crate::engine::{self, HookThread};

/// Prints the session's instructions to the terminal.
pub struct ConsoleObserver;

impl CalibrationObserver for ConsoleObserver {
    fn instruction(&mut self, text: &str) {
        println!();
        println!("{text}");
    }

    fn status(&mut self, text: &str) {
        if !text.is_empty() {
            println!("  {text}");
        }
    }

    fn phase_started(&mut self, phase: Phase, duration: Duration) {
        println!("  Recording {phase} movement for {:.1}s...", duration.as_secs_f64());
    }

    fn phase_finished(&mut self, phase: Phase, samples: usize) {
        tracing::info!(%phase, samples, "Calibration phase finished");
    }
}

/// Start a session on a blocking thread. The returned handle yields the outcome.
pub fn spawn_session(
    mut session: CalibrationSession,
) -> tokio::task::JoinHandle<CalibrationOutcome> {
    tokio::task::spawn_blocking(move || {
        session.run(&mut SleepScheduler::default(), &mut ConsoleObserver)
    })
}

pub async fn run(config_path: PathBuf, save: bool) -> anyhow::Result<()> {
    let mut config = engine::load_config(&config_path)?;
    let control = EngineControl::from_config(&config);
    // Observation only: motion between phases stays unfiltered too.
    control.set_user_enabled(false);

    let hook = HookThread::spawn(&config, Arc::clone(&control), None).await?;

    let session = CalibrationSession::new(
        Arc::clone(&control),
        CalibrationTimings::from_config(&config),
    );
    let cancel = session.cancel_token();
    let cancel_on_signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let outcome = spawn_session(session)
        .await
        .context("calibration task panicked");
    cancel_on_signal.abort();
    hook.shutdown().await?;

    match outcome? {
        CalibrationOutcome::Applied(params) => {
            println!();
            print_params(&params);
            if save {
                config.v_min = params.v_min;
                config.v_max = params.v_max;
                config.save_to(&config_path)?;
                println!("Saved to {}", config_path.display());
            } else {
                println!("Run with --save to keep these thresholds.");
            }
        }
        CalibrationOutcome::InsufficientData => {
            anyhow::bail!("calibration collected too little movement");
        }
        CalibrationOutcome::Cancelled => {}
    }
    Ok(())
}

pub fn print_params(params: &EmaParams) {
    println!("  v_min:     {:>8} px/s", params.v_min);
    println!("  v_max:     {:>8} px/s", params.v_max);
    println!("  alpha_min: {:>8}", params.alpha_min);
    println!("  alpha_max: {:>8}", params.alpha_max);
}
