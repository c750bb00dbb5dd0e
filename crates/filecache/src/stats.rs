//! Cache statistics for monitoring and debugging

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered without running a converter
    pub hits: u64,
    /// Lookups that ran a converter
    pub misses: u64,
    /// Misses that replaced an existing, stale value
    pub refreshes: u64,
    /// Converter runs that returned an error
    pub conversion_failures: u64,
    /// Registered converters
    pub registrations: usize,
    /// Populated value entries
    pub entries: usize,
}

impl CacheStats {
    /// Hit ratio as a percentage, 0 when nothing was looked up yet
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    conversion_failures: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self, stale: bool) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        if stale {
            self.refreshes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn conversion_failed(&self) {
        self.conversion_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, registrations: usize, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
            registrations,
            entries,
        }
    }

    pub(crate) fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.refreshes.store(0, Ordering::Relaxed);
        self.conversion_failures.store(0, Ordering::Relaxed);
    }
}
