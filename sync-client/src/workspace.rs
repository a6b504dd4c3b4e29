//! Workspace membership: create, join, and the locally cached workspace id.
//!
//! Joining only ever touches the membership record. It never uploads a
//! snapshot, so a fresh device cannot overwrite a workspace's history with
//! its empty state.

use std::sync::Arc;
use sync_types::{DeviceId, InviteCode, WorkspaceId, WorkspaceRecord};

use crate::error::ClientError;
use crate::relay::Relay;
use crate::storage::{keys, KeyValueStore, StorageError};

/// Read the cached workspace id, if any.
pub async fn cached_workspace_id(
    storage: &dyn KeyValueStore,
) -> Result<Option<WorkspaceId>, ClientError> {
    match storage.get_string(keys::WORKSPACE_ID).await? {
        None => Ok(None),
        Some(text) => text.trim().parse::<WorkspaceId>().map(Some).map_err(|e| {
            ClientError::from(StorageError::Corrupt {
                key: keys::WORKSPACE_ID.to_string(),
                reason: e.to_string(),
            })
        }),
    }
}

/// Creates and joins workspaces on the relay.
pub struct WorkspaceDirectory<R> {
    relay: Arc<R>,
    storage: Arc<dyn KeyValueStore>,
}

impl<R: Relay> WorkspaceDirectory<R> {
    /// Create a directory over a relay and local storage.
    pub fn new(relay: Arc<R>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { relay, storage }
    }

    /// The cached workspace id, if this device created or joined one.
    pub async fn current(&self) -> Result<Option<WorkspaceId>, ClientError> {
        cached_workspace_id(self.storage.as_ref()).await
    }

    /// Fetch the full record of the cached workspace.
    pub async fn workspace(&self) -> Result<WorkspaceRecord, ClientError> {
        let id = self.current().await?.ok_or(ClientError::NoWorkspace)?;
        Ok(self.relay.fetch_workspace(&id).await?)
    }

    /// Create a workspace with this device as its only member and cache its id.
    pub async fn create(&self, device: &DeviceId) -> Result<WorkspaceRecord, ClientError> {
        let record = self.relay.create_workspace(device).await?;
        self.cache(&record.id).await?;
        tracing::info!(workspace = %record.id, device = %device, "created workspace");
        Ok(record)
    }

    /// Join an existing workspace.
    ///
    /// The invite code must match exactly. A mismatch returns
    /// [`ClientError::Authorization`] and leaves local state untouched.
    pub async fn join(
        &self,
        id: &WorkspaceId,
        invite_code: &InviteCode,
        device: &DeviceId,
    ) -> Result<WorkspaceRecord, ClientError> {
        let record = self.relay.fetch_workspace(id).await?;

        if !record.invite_code.verify(invite_code) {
            tracing::warn!(workspace = %id, "invite code rejected");
            return Err(ClientError::Authorization("invalid invite code".into()));
        }

        let record = if record.has_member(device) {
            tracing::debug!(workspace = %id, "device already a member");
            record
        } else {
            self.relay.append_device(id, device).await?
        };

        self.cache(&record.id).await?;
        tracing::info!(
            workspace = %record.id,
            device = %device,
            members = record.device_ids.len(),
            "joined workspace"
        );
        Ok(record)
    }

    /// Join when given an id and invite code, otherwise reuse the cached
    /// workspace or create a new one.
    pub async fn ensure(
        &self,
        join: Option<(&WorkspaceId, &InviteCode)>,
        device: &DeviceId,
    ) -> Result<WorkspaceId, ClientError> {
        if let Some((id, code)) = join {
            return Ok(self.join(id, code, device).await?.id);
        }
        match self.current().await? {
            Some(id) => Ok(id),
            None => Ok(self.create(device).await?.id),
        }
    }

    /// Forget the cached workspace. Relay membership is left as is.
    pub async fn leave(&self) -> Result<(), ClientError> {
        self.storage.remove(keys::WORKSPACE_ID).await?;
        tracing::info!("left workspace");
        Ok(())
    }

    async fn cache(&self, id: &WorkspaceId) -> Result<(), ClientError> {
        self.storage
            .set(keys::WORKSPACE_ID, id.to_string().as_bytes())
            .await?;
        Ok(())
    }
}
