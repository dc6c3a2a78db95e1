//! Store statistics types
//!
//! This module provides structures for observing store behavior:
//! - `StoreStats`: A point-in-time snapshot (hits, misses, writes, sizes)
//! - `StatsTracker`: Lock-free counters updated on the request path

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Store statistics for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Number of lookups that found an entry
    pub hits: u64,
    /// Number of lookups that found nothing
    pub misses: u64,
    /// Number of entries written (including overwrites)
    pub writes: u64,
    /// Current number of entries
    pub entries: u64,
    /// Approximate size of all entries in bytes
    pub size_bytes: u64,
}

impl StoreStats {
    /// Calculate hit rate (hits / total lookups)
    /// Returns 0.0 if there have been no lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Atomic counters shared between the store and its callers
#[derive(Debug, Default)]
pub(crate) struct StatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl StatsTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters together with the caller-supplied sizes
    pub(crate) fn snapshot(&self, entries: u64, size_bytes: u64) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            entries,
            size_bytes,
        }
    }
}
