//! Cache Store Module
//!
//! Persistent cache engine backed by an embedded SQLite database, with TTL
//! expiration enforced lazily on reads and eagerly by sweeps.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::cache::clock::{epoch_seconds, system_clock, SharedClock};
use crate::cache::entry::{clamp_ttl, EXPIRED_PREDICATE_SQL};
use crate::cache::{CacheKey, CacheRecord, CacheStats};
use crate::error::{CacheError, CacheResult};

/// File name of the database inside the configured cache directory.
pub const DATABASE_FILE: &str = "ontology_cache.db";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cache_records (
        key         TEXT PRIMARY KEY,
        payload     TEXT NOT NULL,
        created_at  INTEGER NOT NULL,
        ttl_seconds INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_cache_records_created_at
        ON cache_records (created_at);
";

// == Sweep Report ==
/// Outcome of a stale-record sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Records removed by this sweep
    pub removed: usize,
    /// Records left in the store afterwards
    pub remaining: usize,
}

struct StoreInner {
    conn: Connection,
    stats: CacheStats,
}

// == Cache Store ==
/// On-disk cache of serialized lookup results keyed by [`CacheKey`].
///
/// A single connection sits behind a mutex, so each operation, including the
/// delete performed when a lookup finds an expired record, runs under one
/// lock acquisition. SQLite's file locking covers other processes sharing
/// the same directory.
pub struct CacheStore {
    inner: Mutex<StoreInner>,
    clock: SharedClock,
    path: Option<PathBuf>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("path", &self.path)
            .field("conn", &"<sqlite>")
            .finish()
    }
}

impl CacheStore {
    // == Constructors ==
    /// Opens (or creates) the store inside `directory` using the system clock.
    pub fn open(directory: &Path) -> CacheResult<Self> {
        Self::open_with_clock(directory, system_clock())
    }

    /// Opens (or creates) the store inside `directory` with an explicit clock.
    ///
    /// Any failure to create the directory, open the file or initialise the
    /// schema is reported as `StorageUnavailable`.
    pub fn open_with_clock(directory: &Path, clock: SharedClock) -> CacheResult<Self> {
        std::fs::create_dir_all(directory)
            .map_err(|e| CacheError::unavailable(directory, e))?;

        let path = directory.join(DATABASE_FILE);
        let conn = Connection::open(&path).map_err(|e| CacheError::unavailable(&path, e))?;
        Self::configure(&conn).map_err(|e| CacheError::unavailable(&path, e))?;

        info!(path = %path.display(), "Opened cache store");
        Ok(Self::from_connection(conn, clock, Some(path)))
    }

    /// Opens a private in-memory store, mainly for tests.
    pub fn open_in_memory(clock: SharedClock) -> CacheResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| CacheError::unavailable(":memory:", e))?;
        Self::configure(&conn).map_err(|e| CacheError::unavailable(":memory:", e))?;
        Ok(Self::from_connection(conn, clock, None))
    }

    fn configure(conn: &Connection) -> rusqlite::Result<()> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)
    }

    fn from_connection(conn: Connection, clock: SharedClock, path: Option<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                conn,
                stats: CacheStats::new(),
            }),
            clock,
            path,
        }
    }

    /// Location of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // == Get ==
    /// Looks up a live record.
    ///
    /// Returns `None` when the key is absent, expired or corrupt. Expired
    /// and corrupt records are deleted as a side effect; a failure of that
    /// delete is logged, never returned.
    pub fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheRecord>> {
        let now = self.now();
        let mut inner = self.lock()?;

        let row = inner
            .conn
            .query_row(
                "SELECT payload, created_at, ttl_seconds FROM cache_records WHERE key = ?1",
                params![key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, SqlValue>(0)?,
                        row.get::<_, SqlValue>(1)?,
                        row.get::<_, SqlValue>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((payload, created_at, ttl_seconds)) = row else {
            inner.stats.record_miss();
            return Ok(None);
        };

        match CacheRecord::from_columns(key.clone(), payload, created_at, ttl_seconds) {
            Err(e) => {
                warn!(error = %e, "Purging corrupt cache record");
                if let Err(e) = inner.conn.execute(
                    "DELETE FROM cache_records WHERE key = ?1",
                    params![key.as_str()],
                ) {
                    warn!(key = %key.short(), error = %e, "Failed to purge corrupt record");
                }
                inner.stats.record_corrupt_purge();
                Ok(None)
            }
            Ok(record) if record.is_expired_at(now) => {
                debug!(key = %key.short(), age = record.age_at(now), "Cache record expired, removing");
                if let Err(e) = delete_unchanged(&inner.conn, key, record.created_at) {
                    warn!(key = %key.short(), error = %e, "Failed to evict expired record");
                }
                inner.stats.record_expired_eviction();
                Ok(None)
            }
            Ok(record) => {
                inner.stats.record_hit();
                Ok(Some(record))
            }
        }
    }

    // == Put ==
    /// Inserts or replaces the record for `key`, stamped with the current time.
    pub fn put(&self, key: &CacheKey, payload: &str, ttl_seconds: u64) -> CacheResult<()> {
        let now = self.now();
        let mut inner = self.lock()?;

        inner.conn.execute(
            "INSERT OR REPLACE INTO cache_records (key, payload, created_at, ttl_seconds)
             VALUES (?1, ?2, ?3, ?4)",
            params![key.as_str(), payload, now, clamp_ttl(ttl_seconds)],
        )?;
        inner.stats.record_write();

        debug!(key = %key.short(), ttl_seconds, "Stored cache record");
        Ok(())
    }

    // == Remove ==
    /// Deletes the record for `key`. Returns whether one existed.
    pub fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let inner = self.lock()?;
        let removed = inner.conn.execute(
            "DELETE FROM cache_records WHERE key = ?1",
            params![key.as_str()],
        )?;
        Ok(removed > 0)
    }

    /// Deletes the record for `key` only if it is still the one stamped at
    /// `created_at`. Returns whether it was deleted.
    pub fn remove_if_unchanged(&self, key: &CacheKey, created_at: i64) -> CacheResult<bool> {
        let inner = self.lock()?;
        delete_unchanged(&inner.conn, key, created_at)
    }

    // == Sweep Expired ==
    /// Removes every record whose age has reached its own TTL.
    ///
    /// Uses the same predicate as [`CacheRecord::is_expired_at`].
    pub fn sweep_expired(&self) -> CacheResult<SweepReport> {
        let now = self.now();
        let mut inner = self.lock()?;

        let report = {
            let tx = inner.conn.transaction()?;
            let removed = tx.execute(
                &format!("DELETE FROM cache_records WHERE {EXPIRED_PREDICATE_SQL}"),
                params![now],
            )?;
            let remaining = count_records(&tx)?;
            tx.commit()?;
            SweepReport { removed, remaining }
        };

        inner.stats.record_swept(report.removed);
        if report.removed > 0 {
            info!(removed = report.removed, remaining = report.remaining, "Swept expired cache records");
        }
        Ok(report)
    }

    // == Clear All ==
    /// Removes every record regardless of TTL. Returns the number removed.
    pub fn clear_all(&self) -> CacheResult<usize> {
        let mut inner = self.lock()?;
        let removed = inner.conn.execute("DELETE FROM cache_records", [])?;
        inner.stats.record_cleared(removed);

        info!(removed, "Cleared cache");
        Ok(removed)
    }

    // == Length ==
    /// Returns the number of stored records, expired ones included.
    pub fn len(&self) -> CacheResult<usize> {
        let inner = self.lock()?;
        count_records(&inner.conn)
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    // == Stats ==
    /// Returns a snapshot of the counters since this store was opened.
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let inner = self.lock()?;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(count_records(&inner.conn)?);
        Ok(stats)
    }

    /// Current time according to the store's clock, in Unix seconds.
    pub fn now(&self) -> i64 {
        epoch_seconds(self.clock.as_ref())
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, StoreInner>> {
        self.inner.lock().map_err(|_| CacheError::Poisoned)
    }
}

// Matching on created_at leaves a concurrent refresh intact.
fn delete_unchanged(conn: &Connection, key: &CacheKey, created_at: i64) -> CacheResult<bool> {
    let removed = conn.execute(
        "DELETE FROM cache_records WHERE key = ?1 AND created_at = ?2",
        params![key.as_str(), created_at],
    )?;
    Ok(removed > 0)
}

fn count_records(conn: &Connection) -> CacheResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_records", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}
