//! Clock Module
//!
//! Time source for the cache store. Production code uses
//! [`mockable::DefaultClock`]; tests advance a [`ManualClock`] instead of
//! sleeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

/// Shared clock handle injected into the store.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Returns the system clock.
pub fn system_clock() -> SharedClock {
    Arc::new(mockable::DefaultClock)
}

/// Current time in whole Unix seconds.
pub fn epoch_seconds(clock: &(dyn Clock + Send + Sync)) -> i64 {
    clock.utc().timestamp()
}

// == Manual Clock ==
/// Clock that only moves when told to.
///
/// Cloning shares the underlying time, so a test can keep one handle and
/// give the other to the store.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock frozen at the given Unix second.
    pub fn at(epoch_seconds: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(epoch_seconds)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jumps to an absolute Unix second.
    pub fn set(&self, epoch_seconds: i64) {
        self.now.store(epoch_seconds, Ordering::SeqCst);
    }

    /// Wraps this clock for injection into a store.
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }

    fn current(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.now.load(Ordering::SeqCst), 0)
            .single()
            .unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.current().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at(1_700_000_000);
        let shared = clock.shared();

        assert_eq!(epoch_seconds(shared.as_ref()), 1_700_000_000);
        clock.advance(3);
        assert_eq!(epoch_seconds(shared.as_ref()), 1_700_000_003);
        clock.set(42);
        assert_eq!(epoch_seconds(shared.as_ref()), 42);
    }

    #[test]
    fn test_system_clock_is_recent() {
        let now = epoch_seconds(system_clock().as_ref());
        // 2023-01-01
        assert!(now > 1_672_531_200);
    }
}
