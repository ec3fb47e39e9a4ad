//! Cache Statistics Module
//!
//! Tracks cache effectiveness: hits, misses, and the ways records leave the store.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the store
    pub hits: u64,
    /// Lookups that found nothing usable (absent, expired or corrupt)
    pub misses: u64,
    /// Records inserted or refreshed
    pub writes: u64,
    /// Expired records removed on the read path
    pub expired_evictions: u64,
    /// Undecodable records removed on discovery
    pub corrupt_purged: u64,
    /// Records removed by sweeps
    pub swept: u64,
    /// Records removed by clear-all
    pub cleared: u64,
    /// Current number of records in the store
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    /// An expired record was found and removed by a lookup.
    pub fn record_expired_eviction(&mut self) {
        self.expired_evictions += 1;
        self.misses += 1;
    }

    /// A corrupt record was found and removed by a lookup.
    pub fn record_corrupt_purge(&mut self) {
        self.corrupt_purged += 1;
        self.misses += 1;
    }

    pub fn record_swept(&mut self, count: usize) {
        self.swept += count as u64;
    }

    pub fn record_cleared(&mut self, count: usize) {
        self.cleared += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
