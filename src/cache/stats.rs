//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and computations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of gets answered from a live entry
    pub hits: u64,
    /// Number of gets that found nothing live
    pub misses: u64,
    /// Number of Producer invocations
    pub computations: u64,
    /// Number of Producer invocations that failed or timed out
    pub compute_failures: u64,
    /// Number of misses that joined a computation already in flight
    pub coalesced: u64,
    /// Number of writes discarded after losing a version race
    pub stale_writes: u64,
    /// Number of entries removed by invalidate / invalidate_type
    pub invalidations: u64,
    /// Number of entries removed by the sweep
    pub reaped: u64,
    /// Physically stored entries, stale included
    pub total_entries: usize,
    /// Computations currently in flight
    pub in_flight: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters updated from concurrent callers.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    compute_failures: AtomicU64,
    coalesced: AtomicU64,
    stale_writes: AtomicU64,
    invalidations: AtomicU64,
    reaped: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_computation(&self) {
        self.computations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compute_failure(&self) {
        self.compute_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_write(&self) {
        self.stale_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_reaped(&self, count: u64) {
        self.reaped.fetch_add(count, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters; entry and in-flight counts are filled by the caller.
    pub fn snapshot(&self, total_entries: usize, in_flight: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            stale_writes: self.stale_writes.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
            total_entries,
            in_flight,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StatsRecorder::new().snapshot(0, 0);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let recorder = StatsRecorder::new();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_miss();
        assert_eq!(recorder.snapshot(0, 0).hit_rate(), 0.75);
    }

    #[test]
    fn test_snapshot_carries_counts() {
        let recorder = StatsRecorder::new();
        recorder.record_computation();
        recorder.record_compute_failure();
        recorder.record_coalesced();
        recorder.record_stale_write();
        recorder.record_invalidations(3);
        recorder.record_reaped(2);

        let stats = recorder.snapshot(7, 1);
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.compute_failures, 1);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.stale_writes, 1);
        assert_eq!(stats.invalidations, 3);
        assert_eq!(stats.reaped, 2);
        assert_eq!(stats.total_entries, 7);
        assert_eq!(stats.in_flight, 1);
    }

    #[test]
    fn test_stats_serialize() {
        let json = serde_json::to_value(StatsRecorder::new().snapshot(4, 0)).unwrap();
        assert_eq!(json["total_entries"], 4);
        assert_eq!(json["hits"], 0);
    }
}
