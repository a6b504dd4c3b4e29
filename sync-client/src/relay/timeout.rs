//! Per-call timeouts for any relay.

use super::{Relay, RelayError};
use crate::config::RelaySettings;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use sync_types::{DeviceId, NewSnapshot, SnapshotRecord, WorkspaceId, WorkspaceRecord};

/// Wraps a relay and fails any call that takes longer than `timeout` with
/// [`RelayError::Unavailable`].
#[derive(Debug, Clone)]
pub struct TimeoutRelay<R> {
    inner: R,
    timeout: Duration,
}

impl<R: Relay> TimeoutRelay<R> {
    /// Wrap `inner`.
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Wrap `inner` using the configured per-call timeout.
    pub fn from_settings(inner: R, settings: &RelaySettings) -> Self {
        Self::new(inner, settings.timeout())
    }

    /// The wrapped relay.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, RelayError>> + Send,
    ) -> Result<T, RelayError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "relay call timed out");
                Err(RelayError::Unavailable(format!(
                    "{} timed out after {:?}",
                    op, self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl<R: Relay> Relay for TimeoutRelay<R> {
    async fn create_workspace(&self, device: &DeviceId) -> Result<WorkspaceRecord, RelayError> {
        self.call("create_workspace", self.inner.create_workspace(device))
            .await
    }

    async fn fetch_workspace(&self, id: &WorkspaceId) -> Result<WorkspaceRecord, RelayError> {
        self.call("fetch_workspace", self.inner.fetch_workspace(id))
            .await
    }

    async fn append_device(
        &self,
        id: &WorkspaceId,
        device: &DeviceId,
    ) -> Result<WorkspaceRecord, RelayError> {
        self.call("append_device", self.inner.append_device(id, device))
            .await
    }

    async fn create_snapshot(&self, snapshot: NewSnapshot) -> Result<SnapshotRecord, RelayError> {
        self.call("create_snapshot", self.inner.create_snapshot(snapshot))
            .await
    }

    async fn latest_snapshot(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<Option<SnapshotRecord>, RelayError> {
        self.call("latest_snapshot", self.inner.latest_snapshot(workspace))
            .await
    }
}
