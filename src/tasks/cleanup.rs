//! Cache Sweep Task
//!
//! Background task that periodically removes expired records from the
//! persistent search cache.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::SearchCache;

/// Spawns a background task that sweeps expired cache records.
///
/// The task sleeps for `cleanup_interval_secs` between sweeps. A cache in
/// bypass mode has nothing to sweep, so each failed sweep is logged and the
/// loop carries on. Abort the returned handle during shutdown.
pub fn spawn_cleanup_task(cache: SearchCache, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.sweep_expired().await {
                Ok(report) if report.removed > 0 => {
                    info!(
                        removed = report.removed,
                        remaining = report.remaining,
                        "Cache sweep removed expired records"
                    );
                }
                Ok(report) => {
                    debug!(remaining = report.remaining, "Cache sweep: nothing expired");
                }
                Err(e) => warn!(error = %e, "Cache sweep failed"),
            }
        }
    })
}
