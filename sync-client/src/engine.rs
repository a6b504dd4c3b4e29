//! Sync engine: runs pull/push cycles for one device.
//!
//! A cycle moves the published status `Idle → Syncing → Idle | Error` and
//! executes the steps of its [`SyncType`] in order. Pull always runs before
//! push, so a device merges the newest remote state before uploading its own.
//!
//! At most one cycle runs at a time. A trigger that arrives while a cycle is
//! in flight is dropped and reported as [`CycleOutcome::Skipped`]; it is not
//! queued.
//!
//! # Example
//!
//! ```ignore
//! let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir).await?);
//! let identity = DeviceIdentity::load_or_generate(storage.as_ref()).await?;
//! let registry = Arc::new(Registry::new().with_store(notes.clone())?);
//! let engine = SyncEngine::new(identity, registry, Arc::new(relay), storage);
//!
//! engine.create_workspace().await?;
//! engine.sync(SyncType::Both).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_core::{CycleStep, StatusEvent, SyncStatus, SyncType, DEFAULT_TOMBSTONE_RETENTION};
use sync_types::{DeviceId, InviteCode, SnapshotRecord, Timestamp, WorkspaceId, WorkspaceRecord};
use thiserror::Error;
use tokio::sync::watch;

use crate::config::SyncSettings;
use crate::crypto::encrypt_snapshot;
use crate::error::ClientError;
use crate::identity::DeviceIdentity;
use crate::observer::{SyncObserver, TracingObserver};
use crate::registry::Registry;
use crate::relay::Relay;
use crate::storage::KeyValueStore;
use crate::transport::{PullOutcome, SnapshotTransport};
use crate::workspace::WorkspaceDirectory;

/// What a completed cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Pull result, if the cycle pulled.
    pub pulled: Option<PullOutcome>,
    /// Snapshot record created, if the cycle pushed.
    pub pushed: Option<SnapshotRecord>,
}

/// Result of a sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every requested step succeeded.
    Completed(CycleReport),
    /// Another cycle was in flight; this trigger was dropped.
    Skipped,
}

/// A failed cycle.
///
/// A pull that completed before the failing step is not rolled back and is
/// reported in `pulled`.
#[derive(Debug, Error)]
#[error("sync cycle failed: {source}")]
pub struct CycleError {
    /// Pull result, if the pull step completed.
    pub pulled: Option<PullOutcome>,
    /// The error that stopped the cycle.
    #[source]
    pub source: ClientError,
}

impl From<ClientError> for CycleError {
    fn from(source: ClientError) -> Self {
        Self {
            pulled: None,
            source,
        }
    }
}

/// Single-flight flag, released on drop.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates sync for one device.
pub struct SyncEngine<R> {
    identity: DeviceIdentity,
    registry: Arc<Registry>,
    directory: WorkspaceDirectory<R>,
    transport: SnapshotTransport<R>,
    observer: Arc<dyn SyncObserver>,
    retention: Duration,
    pull_on_startup: bool,
    busy: AtomicBool,
}

impl<R: Relay> SyncEngine<R> {
    /// Create an engine with the default retention and a [`TracingObserver`].
    pub fn new(
        identity: DeviceIdentity,
        registry: Arc<Registry>,
        relay: Arc<R>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            identity,
            registry,
            directory: WorkspaceDirectory::new(relay.clone(), storage.clone()),
            transport: SnapshotTransport::new(relay, storage),
            observer: Arc::new(TracingObserver),
            retention: DEFAULT_TOMBSTONE_RETENTION,
            pull_on_startup: true,
            busy: AtomicBool::new(false),
        }
    }

    /// Builder: replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Builder: set the tombstone retention window.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Builder: apply retention and startup behaviour from settings.
    pub fn with_settings(mut self, settings: &SyncSettings) -> Self {
        self.retention = settings.retention.tombstone_retention();
        self.pull_on_startup = settings.sync.pull_on_startup;
        self
    }

    /// This device's id.
    pub fn device_id(&self) -> DeviceId {
        self.identity.device_id()
    }

    /// This device's identity.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// The store registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Current sync status.
    pub fn status(&self) -> SyncStatus {
        self.registry.sync_status()
    }

    /// Watch sync status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.registry.subscribe()
    }

    /// Whether a cycle is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// The cached workspace id.
    pub async fn workspace_id(&self) -> Result<Option<WorkspaceId>, ClientError> {
        self.directory.current().await
    }

    /// Create a workspace with this device as its only member.
    pub async fn create_workspace(&self) -> Result<WorkspaceRecord, ClientError> {
        self.directory.create(&self.identity.device_id()).await
    }

    /// Join an existing workspace. Never pushes.
    pub async fn join_workspace(
        &self,
        id: &WorkspaceId,
        invite_code: &InviteCode,
    ) -> Result<WorkspaceRecord, ClientError> {
        self.directory
            .join(id, invite_code, &self.identity.device_id())
            .await
    }

    /// Forget the cached workspace.
    pub async fn leave_workspace(&self) -> Result<(), ClientError> {
        self.directory.leave().await
    }

    /// Drop expired tombstones from every store.
    pub fn purge_tombstones(&self) -> usize {
        self.purge_tombstones_at(Timestamp::now())
    }

    /// Drop tombstones that expired as of `now`.
    pub fn purge_tombstones_at(&self, now: Timestamp) -> usize {
        self.registry.purge_tombstones(now, self.retention)
    }

    /// Startup hook: purge expired tombstones, then sync if a workspace is
    /// cached and pulling on startup is enabled.
    pub async fn startup(&self) -> Result<Option<CycleOutcome>, CycleError> {
        self.purge_tombstones();
        if !self.pull_on_startup {
            return Ok(None);
        }
        match self.directory.current().await? {
            Some(_) => self.sync(SyncType::Both).await.map(Some),
            None => {
                tracing::debug!("no workspace cached, skipping startup sync");
                Ok(None)
            }
        }
    }

    /// Run one sync cycle.
    pub async fn sync(&self, sync_type: SyncType) -> Result<CycleOutcome, CycleError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            self.observer.on_cycle_skipped(sync_type);
            return Ok(CycleOutcome::Skipped);
        };

        self.transition(StatusEvent::CycleStarted);
        self.observer.on_cycle_started(sync_type);

        let mut report = CycleReport::default();
        for step in sync_type.steps() {
            let result = match step {
                CycleStep::Pull => self.pull().await.map(|outcome| report.pulled = Some(outcome)),
                CycleStep::Push => self.push().await.map(|record| report.pushed = Some(record)),
            };

            if let Err(error) = result {
                self.transition(StatusEvent::CycleFailed {
                    error: error.to_string(),
                });
                self.observer.on_cycle_failed(sync_type, &error);
                return Err(CycleError {
                    pulled: report.pulled,
                    source: error,
                });
            }
        }

        self.transition(StatusEvent::CycleSucceeded);
        Ok(CycleOutcome::Completed(report))
    }

    async fn pull(&self) -> Result<PullOutcome, ClientError> {
        let outcome = self
            .transport
            .pull_latest_snapshot(&self.registry, self.identity.key())
            .await?;

        if let PullOutcome::Hydrated { summary, .. } = &outcome {
            for error in summary.malformed() {
                self.observer.on_entity_skipped(&error);
            }
        }
        self.observer.on_pulled(&outcome);
        Ok(outcome)
    }

    async fn push(&self) -> Result<SnapshotRecord, ClientError> {
        let snapshot = self.registry.get_all_store_states()?;
        let ciphertext = encrypt_snapshot(&snapshot, self.identity.key())?;
        self.transport.store_exported(&ciphertext).await?;

        let record = self.transport.push_snapshot().await?;
        self.observer.on_pushed(&record);
        Ok(record)
    }

    fn transition(&self, event: StatusEvent) {
        let status = self.registry.apply_status_event(event);
        self.observer.on_status_changed(&status);
    }
}

impl<R> std::fmt::Debug for SyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("device_id", &self.identity.device_id())
            .field("registry", &self.registry)
            .field("retention", &self.retention)
            .field("busy", &self.busy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
