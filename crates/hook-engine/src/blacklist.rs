//! Foreground-process blacklist.
//!
//! Polls the foreground window's process and holds the
//! [`PauseReason::Blacklist`] pause while a listed process is in front.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use steadyhand_platform_core::{normalize_process_name, ForegroundProbe};
use tokio::sync::watch;

use crate::control::{EngineControl, PauseReason};

pub struct BlacklistMonitor {
    names: HashSet<String>,
    control: Arc<EngineControl>,
    paused: bool,
}

impl BlacklistMonitor {
    pub fn new<S: AsRef<str>>(control: Arc<EngineControl>, names: &[S]) -> Self {
        let names = names
            .iter()
            .map(|n| normalize_process_name(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self {
            names,
            control,
            paused: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Case-insensitive, with or without `.exe`.
    pub fn is_blacklisted(&self, process_name: &str) -> bool {
        self.names.contains(&normalize_process_name(process_name))
    }

    /// Whether this monitor currently holds the pause.
    pub fn is_holding_pause(&self) -> bool {
        self.paused
    }

    /// Sample the foreground once and update the pause. Returns whether the
    /// foreground process is blacklisted.
    ///
    /// A failing probe counts as "not blacklisted".
    pub fn tick(&mut self, probe: &dyn ForegroundProbe) -> bool {
        let name = match probe.foreground_process_name() {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(error = %e, "Foreground process lookup failed");
                None
            }
        };

        let listed = name.as_deref().is_some_and(|n| self.is_blacklisted(n));
        if listed != self.paused {
            self.paused = listed;
            if listed {
                self.control.pause(PauseReason::Blacklist);
                tracing::info!(
                    process = name.as_deref().unwrap_or_default(),
                    "Blacklisted process in foreground; smoothing paused"
                );
            } else {
                self.control.resume(PauseReason::Blacklist);
                tracing::info!("Blacklisted process left the foreground; smoothing resumed");
            }
        }
        listed
    }

    /// Drop the pause if this monitor holds it.
    pub fn release(&mut self) {
        if self.paused {
            self.paused = false;
            self.control.resume(PauseReason::Blacklist);
        }
    }

    /// Poll every `interval` until `shutdown` turns true or its sender is dropped.
    pub async fn run(
        mut self,
        probe: Arc<dyn ForegroundProbe>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if self.is_empty() {
            tracing::debug!("Blacklist empty; monitor not started");
            return;
        }
        tracing::info!(
            processes = self.names.len(),
            interval_ms = interval.as_millis() as u64,
            "Blacklist monitor started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(probe.as_ref());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.release();
        tracing::info!("Blacklist monitor stopped");
    }
}
