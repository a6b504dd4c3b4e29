//! Background tasks: periodic sync and tombstone purge.
//!
//! Each task ticks on its own interval and returns a handle that can be used
//! to abort it. A task whose interval is configured as 0 exits immediately.

use std::sync::Arc;
use std::time::Duration;
use sync_core::SyncType;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::{RetentionSettings, ScheduleSettings};
use crate::engine::{CycleOutcome, SyncEngine};
use crate::relay::Relay;

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// Spawn a task running a full sync cycle every `interval_secs`.
///
/// Failed cycles are logged and retried on the next tick only.
pub fn spawn_sync_task<R>(
    engine: Arc<SyncEngine<R>>,
    settings: ScheduleSettings,
) -> tokio::task::JoinHandle<()>
where
    R: Relay + 'static,
{
    tokio::spawn(async move {
        let Some(period) = settings.interval() else {
            tracing::info!("Sync task disabled");
            return;
        };

        tracing::info!("Sync task started (interval: {}s)", period.as_secs());
        let mut timer = ticker(period);

        loop {
            timer.tick().await;

            match engine.sync(SyncType::Both).await {
                Ok(CycleOutcome::Completed(_)) => tracing::debug!("Scheduled sync completed"),
                Ok(CycleOutcome::Skipped) => tracing::debug!("Scheduled sync skipped, cycle in flight"),
                Err(e) => tracing::error!("Scheduled sync error: {}", e),
            }
        }
    })
}

/// Spawn a task purging expired tombstones every `purge_interval_secs`.
pub fn spawn_purge_task<R>(
    engine: Arc<SyncEngine<R>>,
    settings: RetentionSettings,
) -> tokio::task::JoinHandle<()>
where
    R: Relay + 'static,
{
    tokio::spawn(async move {
        let Some(period) = settings.purge_interval() else {
            tracing::info!("Purge task disabled");
            return;
        };

        tracing::info!("Purge task started (interval: {}s)", period.as_secs());
        let mut timer = ticker(period);

        loop {
            timer.tick().await;

            let purged = engine.purge_tombstones();
            if purged > 0 {
                tracing::info!("Purge: dropped {} expired tombstones", purged);
            } else {
                tracing::debug!("Purge: no expired tombstones");
            }
        }
    })
}
