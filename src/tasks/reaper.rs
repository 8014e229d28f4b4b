//! Expiry Reaper Task
//!
//! Background task that periodically sweeps expired rule cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::EntryStore;
use crate::config::DEFAULT_SWEEP_INTERVAL;
use crate::producer::Producer;
use crate::service::RuleCacheService;

/// Spawns a background task that calls [`RuleCacheService::reap`] every
/// `interval`.
///
/// A failed sweep is logged and the task carries on; whatever it missed is
/// picked up by the next one. A zero `interval` is replaced by
/// [`DEFAULT_SWEEP_INTERVAL`].
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let service = RuleCacheService::new(MemoryEntryStore::new(), producer);
/// let reaper = spawn_reaper_task(service.clone(), Duration::from_secs(30));
/// // Later, during shutdown:
/// reaper.abort();
/// ```
pub fn spawn_reaper_task<S, P>(service: RuleCacheService<S, P>, interval: Duration) -> JoinHandle<()>
where
    S: EntryStore,
    P: Producer,
{
    let interval = if interval.is_zero() {
        warn!(
            "Reaper interval must be positive, using {:?}",
            DEFAULT_SWEEP_INTERVAL
        );
        DEFAULT_SWEEP_INTERVAL
    } else {
        interval
    };

    tokio::spawn(async move {
        info!("Starting reaper task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match service.reap().await {
                Ok(report) if report.removed > 0 || report.failed > 0 => {
                    info!(
                        "Reaper: removed {} expired entries ({} skipped, {} failed)",
                        report.removed, report.skipped, report.failed
                    );
                }
                Ok(report) => {
                    debug!("Reaper: nothing to remove ({} skipped)", report.skipped);
                }
                Err(e) => {
                    warn!("Reaper sweep failed, retrying next interval: {}", e);
                }
            }
        }
    })
}
