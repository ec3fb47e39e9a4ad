//! Search Cache Service
//!
//! Async facade over [`CacheStore`] used by the tool handlers. Storage calls
//! run on the blocking pool, every cache failure on the lookup path degrades
//! to a miss, and an unopenable store puts the cache in bypass mode.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStats, CacheStore, SweepReport};
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};

/// Marker added to payloads served from the cache.
pub const CACHED_FIELD: &str = "_cached";
/// Age in seconds of a payload served from the cache.
pub const CACHE_AGE_FIELD: &str = "_cache_age_seconds";

// == Search Cache ==
/// Shared handle to the search cache; cheap to clone.
#[derive(Debug, Clone)]
pub struct SearchCache {
    store: Option<Arc<CacheStore>>,
    ttl_seconds: u64,
}

impl SearchCache {
    /// Opens the store described by `config`.
    ///
    /// If the store cannot be opened the cache runs in bypass mode: every
    /// lookup misses and nothing is written.
    pub fn open(config: &CacheConfig) -> Self {
        match CacheStore::open(&config.cache_directory) {
            Ok(store) => Self::with_store(store, config.ttl_seconds),
            Err(e) => {
                warn!(error = %e, "Search cache unavailable, continuing without it");
                Self::bypass(config.ttl_seconds)
            }
        }
    }

    /// Wraps an already opened store.
    pub fn with_store(store: CacheStore, ttl_seconds: u64) -> Self {
        Self {
            store: Some(Arc::new(store)),
            ttl_seconds,
        }
    }

    /// A cache that never stores anything.
    pub fn bypass(ttl_seconds: u64) -> Self {
        Self {
            store: None,
            ttl_seconds,
        }
    }

    /// Whether a backing store is available.
    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// TTL stamped onto new records.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    // == Lookup ==
    /// Returns the cached payload for `key`, annotated with cache metadata.
    ///
    /// Any storage error is logged and reported as a miss. A payload that is
    /// no longer valid JSON is purged.
    pub async fn lookup(&self, key: &CacheKey) -> Option<Value> {
        let store = self.store.clone()?;
        let reader = Arc::clone(&store);
        let lookup_key = key.clone();
        let record = match run_blocking(move || reader.get(&lookup_key)).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(key = %key.short(), "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key.short(), error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<Value>(&record.payload) {
            Ok(mut payload) => {
                debug!(key = %key.short(), "Cache hit");
                annotate_hit(&mut payload, record.age_at(store.now()));
                Some(payload)
            }
            Err(e) => {
                let corrupt = CacheError::CorruptRecord(format!("{}: {e}", key.short()));
                warn!(error = %corrupt, "Purging undecodable cache payload");
                self.purge(key.clone(), record.created_at).await;
                None
            }
        }
    }

    // == Insert ==
    /// Stores a fresh payload under `key` with the configured TTL.
    ///
    /// Payloads that are objects carrying an `error` member are not stored.
    /// Failures are logged and otherwise ignored.
    pub async fn insert(&self, key: &CacheKey, payload: &Value) {
        let Some(store) = self.store.clone() else {
            return;
        };
        if is_error_payload(payload) {
            debug!(key = %key.short(), "Not caching error payload");
            return;
        }

        let serialized = match serde_json::to_string(payload) {
            Ok(s) => s,
            Err(e) => {
                warn!(key = %key.short(), error = %e, "Failed to serialize payload for cache");
                return;
            }
        };

        let ttl = self.ttl_seconds;
        let insert_key = key.clone();
        if let Err(e) = run_blocking(move || store.put(&insert_key, &serialized, ttl)).await {
            warn!(key = %key.short(), error = %e, "Cache insert failed");
        }
    }

    // == Get Or Fetch ==
    /// Serves `key` from the cache, or awaits `fetch` and caches its result.
    ///
    /// Errors from `fetch` are returned unchanged and never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &CacheKey, fetch: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }

        let fresh = fetch().await?;
        self.insert(key, &fresh).await;
        Ok(fresh)
    }

    // == Maintenance ==
    /// Removes every expired record.
    pub async fn sweep_expired(&self) -> CacheResult<SweepReport> {
        let store = self.require_store()?;
        run_blocking(move || store.sweep_expired()).await
    }

    /// Removes every record. Returns the number removed.
    pub async fn clear_all(&self) -> CacheResult<usize> {
        let store = self.require_store()?;
        run_blocking(move || store.clear_all()).await
    }

    /// Counters of the backing store; all zero in bypass mode.
    pub async fn stats(&self) -> CacheStats {
        let Some(store) = self.store.clone() else {
            return CacheStats::new();
        };
        match run_blocking(move || store.stats()).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Failed to read cache statistics");
                CacheStats::new()
            }
        }
    }

    async fn purge(&self, key: CacheKey, created_at: i64) {
        let Some(store) = self.store.clone() else {
            return;
        };
        if let Err(e) = run_blocking(move || store.remove_if_unchanged(&key, created_at)).await {
            warn!(error = %e, "Failed to purge cache record");
        }
    }

    fn require_store(&self) -> CacheResult<Arc<CacheStore>> {
        self.store.clone().ok_or_else(|| CacheError::StorageUnavailable {
            path: Default::default(),
            reason: "cache is running in bypass mode".to_string(),
        })
    }
}

async fn run_blocking<T, F>(op: F) -> CacheResult<T>
where
    F: FnOnce() -> CacheResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| CacheError::Background(e.to_string()))?
}

fn is_error_payload(payload: &Value) -> bool {
    payload
        .as_object()
        .is_some_and(|object| object.contains_key("error"))
}

fn annotate_hit(payload: &mut Value, age_seconds: i64) {
    if let Value::Object(object) = payload {
        object.insert(CACHED_FIELD.to_string(), Value::Bool(true));
        object.insert(
            CACHE_AGE_FIELD.to_string(),
            Value::Number(Number::from(age_seconds)),
        );
    }
}
