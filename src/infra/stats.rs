//! Lock-free runtime counters
//!
//! Counters are bumped from the solver loop and read by a periodic reporter
//! task, so everything is relaxed atomics behind an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct SolverStats {
    mobility_updates: AtomicU64,
    door_updates: AtomicU64,
    alerts_raised: AtomicU64,
    alerts_cleared: AtomicU64,
    decode_failures: AtomicU64,
    publish_failures: AtomicU64,
    stream_restarts: AtomicU64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mobility_update(&self) {
        self.mobility_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_door_update(&self) {
        self.door_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_raised(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_cleared(&self) {
        self.alerts_cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_restart(&self) {
        self.stream_restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mobility_updates(&self) -> u64 {
        self.mobility_updates.load(Ordering::Relaxed)
    }

    pub fn door_updates(&self) -> u64 {
        self.door_updates.load(Ordering::Relaxed)
    }

    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised.load(Ordering::Relaxed)
    }

    pub fn alerts_cleared(&self) -> u64 {
        self.alerts_cleared.load(Ordering::Relaxed)
    }

    pub fn stream_restarts(&self) -> u64 {
        self.stream_restarts.load(Ordering::Relaxed)
    }

    /// Log a one-line summary of all counters
    pub fn log_summary(&self) {
        info!(
            mobility_updates = self.mobility_updates.load(Ordering::Relaxed),
            door_updates = self.door_updates.load(Ordering::Relaxed),
            alerts_raised = self.alerts_raised.load(Ordering::Relaxed),
            alerts_cleared = self.alerts_cleared.load(Ordering::Relaxed),
            decode_failures = self.decode_failures.load(Ordering::Relaxed),
            publish_failures = self.publish_failures.load(Ordering::Relaxed),
            stream_restarts = self.stream_restarts.load(Ordering::Relaxed),
            "stats_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = SolverStats::new();
        stats.record_mobility_update();
        stats.record_mobility_update();
        stats.record_alert_raised();
        stats.record_stream_restart();

        assert_eq!(stats.mobility_updates(), 2);
        assert_eq!(stats.door_updates(), 0);
        assert_eq!(stats.alerts_raised(), 1);
        assert_eq!(stats.stream_restarts(), 1);
    }
}
