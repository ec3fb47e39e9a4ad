//! Cache Module
//!
//! Persistent response cache for ontology lookups: key normalization,
//! SQLite-backed storage with TTL expiration, and the async facade the tool
//! handlers use.

pub mod clock;
mod entry;
mod key;
mod service;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{ManualClock, SharedClock};
pub use entry::CacheRecord;
pub use key::{normalize_text, CacheKey, KeyBuilder, SearchParams};
pub use service::{SearchCache, CACHED_FIELD, CACHE_AGE_FIELD};
pub use stats::CacheStats;
pub use store::{CacheStore, SweepReport, DATABASE_FILE};
