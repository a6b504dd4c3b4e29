//! Snapshot transport: moves encrypted snapshots between scratch storage,
//! the relay and the registry.
//!
//! Pushing uploads whatever ciphertext was last exported to scratch storage
//! as a new, append-only snapshot record. Pulling fetches the newest record,
//! decrypts it and hands it to [`Registry::hydrate_all`].

use std::sync::Arc;
use sync_types::{NewSnapshot, SnapshotId, SnapshotRecord, Timestamp, WorkspaceId};

use crate::crypto::{decrypt_snapshot, DeviceKey};
use crate::error::ClientError;
use crate::registry::{HydrateSummary, Registry, RegistrySnapshot};
use crate::relay::Relay;
use crate::storage::{keys, KeyValueStore};
use crate::workspace::cached_workspace_id;

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The workspace has no snapshot yet.
    Empty,
    /// The latest snapshot was decrypted and merged.
    Hydrated {
        /// Relay id of the snapshot.
        snapshot_id: SnapshotId,
        /// Relay creation time of the snapshot.
        created_at: Timestamp,
        /// Per-store merge results.
        summary: HydrateSummary,
    },
}

/// Pushes and pulls snapshots for the cached workspace.
pub struct SnapshotTransport<R> {
    relay: Arc<R>,
    storage: Arc<dyn KeyValueStore>,
}

impl<R: Relay> SnapshotTransport<R> {
    /// Create a transport over a relay and local storage.
    pub fn new(relay: Arc<R>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { relay, storage }
    }

    async fn workspace_id(&self) -> Result<WorkspaceId, ClientError> {
        cached_workspace_id(self.storage.as_ref())
            .await?
            .ok_or(ClientError::NoWorkspace)
    }

    /// Save an encrypted export to scratch storage for the next push.
    pub async fn store_exported(&self, ciphertext: &[u8]) -> Result<(), ClientError> {
        self.storage.set(keys::LATEST_SNAPSHOT, ciphertext).await?;
        Ok(())
    }

    /// Upload the last exported ciphertext as a new snapshot record.
    pub async fn push_snapshot(&self) -> Result<SnapshotRecord, ClientError> {
        let workspace_id = self.workspace_id().await?;
        let snapshot_blob = self
            .storage
            .get(keys::LATEST_SNAPSHOT)
            .await?
            .ok_or(ClientError::NothingToPush)?;

        let size = snapshot_blob.len();
        let record = self
            .relay
            .create_snapshot(NewSnapshot {
                workspace_id,
                snapshot_blob,
            })
            .await?;

        tracing::info!(
            workspace = %workspace_id,
            snapshot = %record.id,
            bytes = size,
            "pushed snapshot"
        );
        Ok(record)
    }

    /// Fetch, decrypt and merge the newest snapshot of the workspace.
    pub async fn pull_latest_snapshot(
        &self,
        registry: &Registry,
        key: &DeviceKey,
    ) -> Result<PullOutcome, ClientError> {
        let workspace_id = self.workspace_id().await?;
        let Some(record) = self.relay.latest_snapshot(&workspace_id).await? else {
            tracing::debug!(workspace = %workspace_id, "no snapshot to pull");
            return Ok(PullOutcome::Empty);
        };

        let snapshot: RegistrySnapshot = decrypt_snapshot(&record.snapshot_blob, key)?;
        let summary = registry.hydrate_all(&snapshot);

        tracing::info!(
            workspace = %workspace_id,
            snapshot = %record.id,
            stores = summary.stores.len(),
            unknown = summary.unknown.len(),
            "pulled snapshot"
        );
        Ok(PullOutcome::Hydrated {
            snapshot_id: record.id,
            created_at: record.created_at,
            summary,
        })
    }
}
