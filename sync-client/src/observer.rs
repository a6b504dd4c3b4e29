//! Sync lifecycle observer.
//!
//! The engine reports what it does through a [`SyncObserver`] handed to it at
//! construction. Applications hook UI updates or analytics in here;
//! [`TracingObserver`] is the default and turns every callback into a
//! `tracing` event.

use sync_core::{SyncStatus, SyncType};
use sync_types::SnapshotRecord;

use crate::error::ClientError;
use crate::transport::PullOutcome;

/// Callbacks fired by the sync engine. All methods default to no-ops.
pub trait SyncObserver: Send + Sync {
    /// The published status changed.
    fn on_status_changed(&self, _status: &SyncStatus) {}

    /// A cycle began.
    fn on_cycle_started(&self, _sync_type: SyncType) {}

    /// A pull step finished.
    fn on_pulled(&self, _outcome: &PullOutcome) {}

    /// A push step finished.
    fn on_pushed(&self, _record: &SnapshotRecord) {}

    /// An incoming entity or slice was skipped during hydration.
    fn on_entity_skipped(&self, _error: &ClientError) {}

    /// A cycle failed.
    fn on_cycle_failed(&self, _sync_type: SyncType, _error: &ClientError) {}

    /// A trigger arrived while another cycle was in flight and was dropped.
    fn on_cycle_skipped(&self, _sync_type: SyncType) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Observer that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_status_changed(&self, status: &SyncStatus) {
        tracing::debug!(%status, "sync status changed");
    }

    fn on_cycle_started(&self, sync_type: SyncType) {
        tracing::info!(%sync_type, "sync cycle started");
    }

    fn on_pulled(&self, outcome: &PullOutcome) {
        match outcome {
            PullOutcome::Empty => tracing::info!("pull found no snapshot"),
            PullOutcome::Hydrated {
                snapshot_id,
                summary,
                ..
            } => tracing::info!(
                snapshot = %snapshot_id,
                changed = summary.changed(),
                "pull merged snapshot"
            ),
        }
    }

    fn on_pushed(&self, record: &SnapshotRecord) {
        tracing::info!(snapshot = %record.id, "push stored snapshot");
    }

    fn on_entity_skipped(&self, error: &ClientError) {
        tracing::warn!(%error, "skipped incoming data");
    }

    fn on_cycle_failed(&self, sync_type: SyncType, error: &ClientError) {
        tracing::error!(%sync_type, %error, "sync cycle failed");
    }

    fn on_cycle_skipped(&self, sync_type: SyncType) {
        tracing::debug!(%sync_type, "sync already in flight, trigger dropped");
    }
}
