//! Relay record shapes.
//!
//! These are the records the relay stores. The relay can read workspace
//! membership but only ever sees snapshot content as an opaque blob.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{DeviceId, InviteCode, SnapshotId, Timestamp, WorkspaceId};

/// A device group sharing one encrypted sync stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    /// Relay-assigned id.
    pub id: WorkspaceId,
    /// Code a new device must present to join.
    pub invite_code: InviteCode,
    /// Member devices.
    pub device_ids: BTreeSet<DeviceId>,
}

impl WorkspaceRecord {
    /// Whether the device is a member of this workspace.
    pub fn has_member(&self, device_id: &DeviceId) -> bool {
        self.device_ids.contains(device_id)
    }
}

/// A stored encrypted snapshot.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Relay-assigned id.
    pub id: SnapshotId,
    /// Workspace the snapshot belongs to.
    pub workspace_id: WorkspaceId,
    /// Encoded [`crate::SnapshotEnvelope`] (ciphertext).
    pub snapshot_blob: Vec<u8>,
    /// Relay creation time; the latest record per workspace wins.
    pub created_at: Timestamp,
}

impl std::fmt::Debug for SnapshotRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotRecord")
            .field("id", &self.id)
            .field("workspace_id", &self.workspace_id)
            .field(
                "snapshot_blob",
                &format!("[{} bytes]", self.snapshot_blob.len()),
            )
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Request to create a snapshot record.
#[derive(Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    /// Workspace the snapshot belongs to.
    pub workspace_id: WorkspaceId,
    /// Encoded [`crate::SnapshotEnvelope`] (ciphertext).
    pub snapshot_blob: Vec<u8>,
}

impl std::fmt::Debug for NewSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewSnapshot")
            .field("workspace_id", &self.workspace_id)
            .field(
                "snapshot_blob",
                &format!("[{} bytes]", self.snapshot_blob.len()),
            )
            .finish()
    }
}
