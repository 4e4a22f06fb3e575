//! Aggregated per-event latency.
//!
//! Logging every event from the hook thread would add the very latency
//! being measured, so measurements are accumulated and summarized at most
//! once per interval.

use std::time::{Duration, Instant};

use steadyhand_common::clock::duration_micros;

/// One emitted summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    /// Mean processing time in microseconds.
    pub mean_us: f64,
    /// Events measured since the previous summary.
    pub events: u64,
    /// Wall time the summary covers.
    pub window: Duration,
}

#[derive(Debug)]
pub struct LatencyProfiler {
    log_interval: Duration,
    last_log_time: Instant,
    event_count: u64,
    total_latency_us: f64,
}

impl LatencyProfiler {
    pub fn new(log_interval: Duration) -> Self {
        Self::starting_at(log_interval, Instant::now())
    }

    pub fn starting_at(log_interval: Duration, start: Instant) -> Self {
        Self {
            log_interval,
            last_log_time: start,
            event_count: 0,
            total_latency_us: 0.0,
        }
    }

    /// Record one measurement; emits a summary when the interval has passed.
    pub fn log(&mut self, latency: Duration) -> Option<LatencySummary> {
        self.log_at(latency, Instant::now())
    }

    pub fn log_at(&mut self, latency: Duration, now: Instant) -> Option<LatencySummary> {
        self.event_count += 1;
        self.total_latency_us += duration_micros(latency);

        let window = now.saturating_duration_since(self.last_log_time);
        if window <= self.log_interval {
            return None;
        }

        let summary = LatencySummary {
            mean_us: self.total_latency_us / self.event_count as f64,
            events: self.event_count,
            window,
        };
        tracing::info!(
            mean_us = format_args!("{:.2}", summary.mean_us),
            events = summary.events,
            window_secs = format_args!("{:.1}", window.as_secs_f64()),
            "Hook processing latency"
        );

        self.last_log_time = now;
        self.event_count = 0;
        self.total_latency_us = 0.0;
        Some(summary)
    }

    /// Measurements accumulated since the last summary.
    pub fn pending_events(&self) -> u64 {
        self.event_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_within_interval() {
        let start = Instant::now();
        let mut profiler = LatencyProfiler::starting_at(Duration::from_secs(5), start);

        for ms in 0..100 {
            let now = start + Duration::from_millis(ms * 10);
            assert!(profiler
                .log_at(Duration::from_micros(20), now)
                .is_none());
        }
        assert_eq!(profiler.pending_events(), 100);
    }

    #[test]
    fn test_summary_after_interval_then_reset() {
        let start = Instant::now();
        let mut profiler = LatencyProfiler::starting_at(Duration::from_secs(1), start);

        profiler.log_at(Duration::from_micros(10), start + Duration::from_millis(100));
        profiler.log_at(Duration::from_micros(30), start + Duration::from_millis(500));
        let summary = profiler
            .log_at(Duration::from_micros(20), start + Duration::from_millis(1_200))
            .unwrap();

        assert_eq!(summary.events, 3);
        assert!((summary.mean_us - 20.0).abs() < 1e-9);
        assert_eq!(summary.window, Duration::from_millis(1_200));
        assert_eq!(profiler.pending_events(), 0);

        // The next window starts at the summary time.
        assert!(profiler
            .log_at(Duration::from_micros(5), start + Duration::from_millis(2_100))
            .is_none());
        assert!(profiler
            .log_at(Duration::from_micros(5), start + Duration::from_millis(2_300))
            .is_some());
    }

    #[test]
    fn test_exact_interval_does_not_emit() {
        let start = Instant::now();
        let mut profiler = LatencyProfiler::starting_at(Duration::from_secs(1), start);
        assert!(profiler
            .log_at(Duration::from_micros(1), start + Duration::from_secs(1))
            .is_none());
    }
}
