//! Cache Entry Module
//!
//! Defines the persisted cache record and the single expiry predicate shared
//! by lazy eviction and the bulk sweep.

use rusqlite::types::Value as SqlValue;

use crate::cache::CacheKey;
use crate::error::{CacheError, CacheResult};

/// SQL form of [`CacheRecord::is_expired_at`]; `?1` is the current epoch second.
pub(crate) const EXPIRED_PREDICATE_SQL: &str = "MAX(?1 - created_at, 0) >= ttl_seconds";

// == Cache Record ==
/// Represents a single cache record with payload and timing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Normalized query fingerprint
    pub key: CacheKey,
    /// Serialized search result, opaque to the cache
    pub payload: String,
    /// Insertion (or last refresh) time, Unix seconds
    pub created_at: i64,
    /// Lifetime stamped at insertion
    pub ttl_seconds: i64,
}

impl CacheRecord {
    // == Constructor ==
    /// Creates a record stamped at `now`.
    pub fn new(key: CacheKey, payload: impl Into<String>, now: i64, ttl_seconds: u64) -> Self {
        Self {
            key,
            payload: payload.into(),
            created_at: now,
            ttl_seconds: clamp_ttl(ttl_seconds),
        }
    }

    // == Is Expired ==
    /// Checks if the record has expired at the given time.
    ///
    /// Boundary condition: a record is expired once its age is greater than
    /// or equal to its TTL, so a TTL of `T` yields hits strictly before `T`
    /// seconds have elapsed and misses from `T` onwards.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.age_at(now) >= self.ttl_seconds
    }

    /// Age in seconds at the given time; never negative.
    pub fn age_at(&self, now: i64) -> i64 {
        now.saturating_sub(self.created_at).max(0)
    }

    /// Rebuilds a record from raw SQLite column values.
    ///
    /// Any column with an unexpected type yields `CorruptRecord`.
    pub(crate) fn from_columns(
        key: CacheKey,
        payload: SqlValue,
        created_at: SqlValue,
        ttl_seconds: SqlValue,
    ) -> CacheResult<Self> {
        let corrupt = |what: &str| CacheError::CorruptRecord(format!("{}: {what}", key.short()));

        let payload = match payload {
            SqlValue::Text(text) => text,
            SqlValue::Blob(bytes) => {
                String::from_utf8(bytes).map_err(|_| corrupt("payload is not UTF-8"))?
            }
            _ => return Err(corrupt("payload is not text")),
        };
        let (SqlValue::Integer(created_at), SqlValue::Integer(ttl_seconds)) =
            (created_at, ttl_seconds)
        else {
            return Err(corrupt("timestamps are not integers"));
        };

        Ok(Self {
            key,
            payload,
            created_at,
            ttl_seconds,
        })
    }
}

/// Converts a configured TTL into the stored integer form.
pub(crate) fn clamp_ttl(ttl_seconds: u64) -> i64 {
    i64::try_from(ttl_seconds).unwrap_or(i64::MAX)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KeyBuilder;

    fn key() -> CacheKey {
        KeyBuilder::new("test").str("q", "aspirin").build().unwrap()
    }

    #[test]
    fn test_record_creation() {
        let record = CacheRecord::new(key(), "{}", 1_000, 60);
        assert_eq!(record.created_at, 1_000);
        assert_eq!(record.ttl_seconds, 60);
        assert!(!record.is_expired_at(1_000));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let record = CacheRecord::new(key(), "{}", 1_000, 2);

        assert!(!record.is_expired_at(1_001));
        // Exactly T seconds old counts as expired
        assert!(record.is_expired_at(1_002));
        assert!(record.is_expired_at(1_003));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let record = CacheRecord::new(key(), "{}", 1_000, 0);
        assert!(record.is_expired_at(1_000));
    }

    #[test]
    fn test_clock_skew_does_not_underflow() {
        let record = CacheRecord::new(key(), "{}", 1_000, 10);
        assert_eq!(record.age_at(900), 0);
        assert!(!record.is_expired_at(900));
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let record = CacheRecord::new(key(), "{}", 1_000, u64::MAX);
        assert_eq!(record.ttl_seconds, i64::MAX);
        assert!(!record.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_from_columns_rejects_wrong_types() {
        let ok = CacheRecord::from_columns(
            key(),
            SqlValue::Text("{}".into()),
            SqlValue::Integer(5),
            SqlValue::Integer(10),
        );
        assert!(ok.is_ok());

        let bad_time = CacheRecord::from_columns(
            key(),
            SqlValue::Text("{}".into()),
            SqlValue::Text("yesterday".into()),
            SqlValue::Integer(10),
        );
        assert!(matches!(bad_time, Err(CacheError::CorruptRecord(_))));

        let bad_payload = CacheRecord::from_columns(
            key(),
            SqlValue::Blob(vec![0xff, 0xfe]),
            SqlValue::Integer(5),
            SqlValue::Integer(10),
        );
        assert!(matches!(bad_payload, Err(CacheError::CorruptRecord(_))));
    }
}
