//! Response DTOs
//!
//! Bodies returned by the maintenance tools and the HTTP endpoints.

use serde::Serialize;

use crate::cache::{CacheStats, SweepReport};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Whether a backing store is open
    pub cache_available: bool,
    pub ttl_seconds: u64,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub expired_evictions: u64,
    pub corrupt_purged: u64,
    pub swept: u64,
    pub cleared: u64,
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, cache_available: bool, ttl_seconds: u64) -> Self {
        Self {
            cache_available,
            ttl_seconds,
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            expired_evictions: stats.expired_evictions,
            corrupt_purged: stats.corrupt_purged,
            swept: stats.swept,
            cleared: stats.cleared,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Result of `remove_stale_cache_entries` (POST /cache/sweep)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepResponse {
    pub removed_count: usize,
    pub remaining_count: usize,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            removed_count: report.removed,
            remaining_count: report.remaining,
        }
    }
}

/// Result of `clear_cache` (DELETE /cache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearResponse {
    pub cleared_count: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    pub cache_available: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(cache_available: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            cache_available,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
