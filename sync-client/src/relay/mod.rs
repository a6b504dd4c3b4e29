//! Relay abstraction for keepsync.
//!
//! The relay is the only remote party. It stores workspace membership and an
//! append-only list of opaque encrypted snapshots per workspace; it never sees
//! a key or a plaintext.
//!
//! # Design
//!
//! The trait is async and record-oriented:
//! - `create_workspace()` / `fetch_workspace()` manage membership records
//! - `append_device()` adds a member **atomically** on the relay side
//! - `create_snapshot()` appends a snapshot record
//! - `latest_snapshot()` returns the newest record by creation time
//!
//! # Example
//!
//! ```ignore
//! let relay = MockRelay::new();
//! let workspace = relay.create_workspace(&device_id).await?;
//! relay.create_snapshot(NewSnapshot { workspace_id: workspace.id, snapshot_blob }).await?;
//! let latest = relay.latest_snapshot(&workspace.id).await?;
//! ```

mod mock;
mod timeout;

pub use mock::{MockRelay, RelayOp};
pub use timeout::TimeoutRelay;

use async_trait::async_trait;
use sync_types::{DeviceId, NewSnapshot, SnapshotRecord, WorkspaceId, WorkspaceRecord};
use thiserror::Error;

/// Relay errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Could not reach the relay, or it did not answer in time.
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    /// The relay refused the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other relay-side failure.
    #[error("relay error {code}: {message}")]
    Remote {
        /// Relay status code.
        code: u16,
        /// Relay message.
        message: String,
    },
}

/// Remote record store consumed by the client.
///
/// Implementations handle the underlying wire protocol (HTTP, mock, etc).
#[async_trait]
pub trait Relay: Send + Sync {
    /// Create a workspace with `device` as its only member and a fresh
    /// invite code.
    async fn create_workspace(&self, device: &DeviceId) -> Result<WorkspaceRecord, RelayError>;

    /// Fetch a workspace record.
    async fn fetch_workspace(&self, id: &WorkspaceId) -> Result<WorkspaceRecord, RelayError>;

    /// Add `device` to the member set in one relay-side operation and return
    /// the updated record. Appending an existing member is a no-op.
    async fn append_device(
        &self,
        id: &WorkspaceId,
        device: &DeviceId,
    ) -> Result<WorkspaceRecord, RelayError>;

    /// Append a new snapshot record.
    async fn create_snapshot(&self, snapshot: NewSnapshot) -> Result<SnapshotRecord, RelayError>;

    /// The most recently created snapshot for the workspace, if any.
    async fn latest_snapshot(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<Option<SnapshotRecord>, RelayError>;
}
