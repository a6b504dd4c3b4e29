//! Mock relay for testing.
//!
//! Keeps workspaces and snapshots in memory, records every call, and allows
//! injecting failures and latency.

use super::{Relay, RelayError};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_types::{
    DeviceId, InviteCode, NewSnapshot, SnapshotId, SnapshotRecord, Timestamp, WorkspaceId,
    WorkspaceRecord,
};

/// A relay operation, as recorded by [`MockRelay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayOp {
    /// `create_workspace`
    CreateWorkspace,
    /// `fetch_workspace`
    FetchWorkspace,
    /// `append_device`
    AppendDevice,
    /// `create_snapshot`
    CreateSnapshot,
    /// `latest_snapshot`
    LatestSnapshot,
}

/// In-memory relay for testing.
///
/// Clones share state, so several simulated devices can talk to the same
/// relay.
#[derive(Debug, Clone, Default)]
pub struct MockRelay {
    inner: Arc<Mutex<MockRelayInner>>,
}

#[derive(Debug, Default)]
struct MockRelayInner {
    workspaces: HashMap<WorkspaceId, WorkspaceRecord>,
    snapshots: Vec<SnapshotRecord>,
    last_created_at: u64,
    calls: Vec<RelayOp>,
    fail_next: HashMap<RelayOp, RelayError>,
    offline: bool,
    delay: Option<Duration>,
}

impl MockRelay {
    /// Create an empty relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cause the next call of `op` to fail with `error`.
    pub fn fail_next(&self, op: RelayOp, error: RelayError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next.insert(op, error);
    }

    /// While offline, every call fails with [`RelayError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.offline = offline;
    }

    /// Delay every call by `delay` before it is served.
    pub fn set_delay(&self, delay: Option<Duration>) {
        let mut inner = self.inner.lock().unwrap();
        inner.delay = delay;
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<RelayOp> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Number of calls of `op` received so far.
    pub fn call_count(&self, op: RelayOp) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.iter().filter(|c| **c == op).count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.clear();
    }

    /// Stored snapshots for a workspace, oldest first.
    pub fn snapshots(&self, workspace: &WorkspaceId) -> Vec<SnapshotRecord> {
        let inner = self.inner.lock().unwrap();
        inner
            .snapshots
            .iter()
            .filter(|s| s.workspace_id == *workspace)
            .cloned()
            .collect()
    }

    /// Stored workspace record, bypassing failure injection.
    pub fn workspace(&self, id: &WorkspaceId) -> Option<WorkspaceRecord> {
        let inner = self.inner.lock().unwrap();
        inner.workspaces.get(id).cloned()
    }

    /// Record the call, apply injected failures, then wait out any delay.
    ///
    /// The lock is released before sleeping.
    async fn enter(&self, op: RelayOp) -> Result<(), RelayError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(op);
            if inner.offline {
                return Err(RelayError::Unavailable("relay offline".into()));
            }
            if let Some(error) = inner.fail_next.remove(&op) {
                return Err(error);
            }
            inner.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

impl MockRelayInner {
    /// Relay clock: wall time, but strictly increasing.
    fn next_created_at(&mut self) -> Timestamp {
        let next = Timestamp::now()
            .as_millis()
            .max(self.last_created_at + 1);
        self.last_created_at = next;
        Timestamp::from_millis(next)
    }

    fn workspace_mut(&mut self, id: &WorkspaceId) -> Result<&mut WorkspaceRecord, RelayError> {
        self.workspaces
            .get_mut(id)
            .ok_or_else(|| RelayError::NotFound(format!("workspace {}", id)))
    }
}

#[async_trait]
impl Relay for MockRelay {
    async fn create_workspace(&self, device: &DeviceId) -> Result<WorkspaceRecord, RelayError> {
        self.enter(RelayOp::CreateWorkspace).await?;
        let record = WorkspaceRecord {
            id: WorkspaceId::new(),
            invite_code: InviteCode::generate(),
            device_ids: BTreeSet::from([*device]),
        };
        let mut inner = self.inner.lock().unwrap();
        inner.workspaces.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch_workspace(&self, id: &WorkspaceId) -> Result<WorkspaceRecord, RelayError> {
        self.enter(RelayOp::FetchWorkspace).await?;
        let mut inner = self.inner.lock().unwrap();
        inner.workspace_mut(id).map(|w| w.clone())
    }

    async fn append_device(
        &self,
        id: &WorkspaceId,
        device: &DeviceId,
    ) -> Result<WorkspaceRecord, RelayError> {
        self.enter(RelayOp::AppendDevice).await?;
        let mut inner = self.inner.lock().unwrap();
        let workspace = inner.workspace_mut(id)?;
        workspace.device_ids.insert(*device);
        Ok(workspace.clone())
    }

    async fn create_snapshot(&self, snapshot: NewSnapshot) -> Result<SnapshotRecord, RelayError> {
        self.enter(RelayOp::CreateSnapshot).await?;
        let mut inner = self.inner.lock().unwrap();
        inner.workspace_mut(&snapshot.workspace_id)?;

        let record = SnapshotRecord {
            id: SnapshotId::new(),
            workspace_id: snapshot.workspace_id,
            snapshot_blob: snapshot.snapshot_blob,
            created_at: inner.next_created_at(),
        };
        inner.snapshots.push(record.clone());
        Ok(record)
    }

    async fn latest_snapshot(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<Option<SnapshotRecord>, RelayError> {
        self.enter(RelayOp::LatestSnapshot).await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .snapshots
            .iter()
            .filter(|s| s.workspace_id == *workspace)
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}
