//! Simulated devices for scenario tests.
//!
//! A [`Device`] bundles what an application would wire together on one
//! machine: local storage, an identity, two domain stores, a registry and a
//! sync engine. All devices in a scenario share one [`MockRelay`].

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use sync_client::{
    ClientError, CycleError, CycleOutcome, DeviceIdentity, EntityStore, MemoryStore, MockRelay,
    Registry, SyncEngine, SyncObserver, SyncStatus, SyncType, Syncable,
};
use sync_types::{EntityId, WorkspaceRecord};

/// Note payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Note title.
    pub title: String,
}

impl Note {
    /// Note with the given title.
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Task payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task label.
    pub label: String,
    /// Whether the task is done.
    pub done: bool,
}

impl Task {
    /// Open task with the given label.
    pub fn open(label: &str) -> Self {
        Self {
            label: label.into(),
            done: false,
        }
    }
}

/// Observer recording what the engine reported.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    statuses: Mutex<Vec<SyncStatus>>,
    skipped_entities: Mutex<Vec<String>>,
    skipped_cycles: Mutex<usize>,
}

impl RecordingObserver {
    /// Every status published so far.
    pub fn statuses(&self) -> Vec<SyncStatus> {
        self.statuses.lock().unwrap().clone()
    }

    /// Messages of every skipped incoming entity.
    pub fn skipped_entities(&self) -> Vec<String> {
        self.skipped_entities.lock().unwrap().clone()
    }

    /// Number of dropped triggers.
    pub fn skipped_cycles(&self) -> usize {
        *self.skipped_cycles.lock().unwrap()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_status_changed(&self, status: &SyncStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn on_entity_skipped(&self, error: &ClientError) {
        self.skipped_entities.lock().unwrap().push(error.to_string());
    }

    fn on_cycle_skipped(&self, _sync_type: SyncType) {
        *self.skipped_cycles.lock().unwrap() += 1;
    }
}

/// One simulated device.
pub struct Device {
    /// Label used in assertions and logs.
    pub name: &'static str,
    /// The device's engine.
    pub engine: SyncEngine<MockRelay>,
    /// Unordered notes store.
    pub notes: Arc<EntityStore<Note>>,
    /// Ordered tasks store.
    pub tasks: Arc<EntityStore<Task>>,
    /// The device's local storage.
    pub storage: MemoryStore,
    /// What the engine reported.
    pub observer: Arc<RecordingObserver>,
}

impl Device {
    /// A fresh device with its own key.
    pub async fn new(name: &'static str, relay: &MockRelay) -> Result<Self, ClientError> {
        Self::build(name, relay, None).await
    }

    /// A fresh device holding the same key as `peer`, as after pairing.
    pub async fn paired(
        name: &'static str,
        relay: &MockRelay,
        peer: &Device,
    ) -> Result<Self, ClientError> {
        let key = peer.engine.identity().export_key_hex();
        Self::build(name, relay, Some(key.as_str())).await
    }

    /// A fresh device whose `notes` store starts with sync disabled.
    pub async fn with_private_notes(
        name: &'static str,
        relay: &MockRelay,
        peer: &Device,
    ) -> Result<Self, ClientError> {
        let device = Self::paired(name, relay, peer).await?;
        device.notes.set_sync_enabled(false);
        Ok(device)
    }

    async fn build(
        name: &'static str,
        relay: &MockRelay,
        key_hex: Option<&str>,
    ) -> Result<Self, ClientError> {
        init_tracing();

        let storage = MemoryStore::new();
        let mut identity = DeviceIdentity::load_or_generate(&storage).await?;
        if let Some(key_hex) = key_hex {
            identity.import_key_hex(key_hex, &storage).await?;
        }

        let notes = Arc::new(EntityStore::<Note>::new("notes"));
        let tasks = Arc::new(EntityStore::<Task>::ordered("tasks"));
        let registry = Registry::new()
            .with_store(notes.clone())?
            .with_store(tasks.clone())?;

        let observer = Arc::new(RecordingObserver::default());
        let engine = SyncEngine::new(
            identity,
            Arc::new(registry),
            Arc::new(relay.clone()),
            Arc::new(storage.clone()),
        )
        .with_observer(observer.clone());

        tracing::debug!(device = name, id = %engine.device_id(), "device ready");
        Ok(Self {
            name,
            engine,
            notes,
            tasks,
            storage,
            observer,
        })
    }

    /// Create a workspace from this device.
    pub async fn create_workspace(&self) -> Result<WorkspaceRecord, ClientError> {
        self.engine.create_workspace().await
    }

    /// Join the workspace described by `record`.
    pub async fn join(&self, record: &WorkspaceRecord) -> Result<WorkspaceRecord, ClientError> {
        self.engine
            .join_workspace(&record.id, &record.invite_code)
            .await
    }

    /// Run one cycle.
    pub async fn sync(&self, sync_type: SyncType) -> Result<CycleOutcome, CycleError> {
        self.engine.sync(sync_type).await
    }

    /// Current title of a live note.
    pub fn note_title(&self, id: &str) -> Option<String> {
        self.notes
            .get(&EntityId::new(id))
            .filter(|e| e.is_active())
            .map(|e| e.data.title)
    }

    /// Labels of the live tasks, in list order.
    pub fn task_labels(&self) -> Vec<String> {
        self.tasks
            .list_active()
            .into_iter()
            .map(|e| e.data.label)
            .collect()
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG`. Safe to call often.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
