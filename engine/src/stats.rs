//! Process-wide monotonic counters (component C5).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    processed: Arc<AtomicU64>,
    succeeded: AtomicU64,
    failed: AtomicU64,
    active_workers: AtomicU64,
}

/// Atomic snapshot returned by [`Stats::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub active_workers: u64,
}

/// Shared, cheaply clonable handle onto the engine's counters.
#[derive(Clone, Default)]
pub struct Stats(Arc<Counters>);

impl Stats {
    pub fn new() -> Self {
        Self(Arc::new(Counters::default()))
    }

    /// A live, shared handle onto the `processed` counter, so the frontier
    /// can read the current budget usage without round-tripping through
    /// `Stats` itself.
    pub fn processed_handle(&self) -> Arc<AtomicU64> {
        self.0.processed.clone()
    }

    pub fn incr_processed(&self) {
        self.0.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_succeeded(&self) {
        self.0.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_failed(&self) {
        self.0.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_active_workers(&self) {
        self.0.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr_active_workers(&self) {
        self.0.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_workers(&self) -> u64 {
        self.0.active_workers.load(Ordering::Acquire)
    }

    pub fn processed(&self) -> u64 {
        self.0.processed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.0.processed.load(Ordering::Acquire),
            succeeded: self.0.succeeded.load(Ordering::Acquire),
            failed: self.0.failed.load(Ordering::Acquire),
            active_workers: self.0.active_workers.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let s = Stats::new();
        assert_eq!(s.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn succeeded_and_failed_sum_to_processed() {
        let s = Stats::new();
        s.incr_processed();
        s.incr_succeeded();
        s.incr_processed();
        s.incr_failed();
        let snap = s.snapshot();
        assert_eq!(snap.succeeded + snap.failed, snap.processed);
    }

    #[test]
    fn active_workers_tracks_in_flight_count() {
        let s = Stats::new();
        s.incr_active_workers();
        s.incr_active_workers();
        assert_eq!(s.active_workers(), 2);
        s.decr_active_workers();
        assert_eq!(s.active_workers(), 1);
    }
}
