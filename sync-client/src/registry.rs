//! Store registry.
//!
//! The registry is the single place that knows which stores take part in
//! sync. It builds the aggregate snapshot, fans incoming snapshots back out
//! to the matching stores, and publishes the engine's [`SyncStatus`] to
//! anyone holding a [`watch::Receiver`].

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use sync_core::{StatusEvent, SyncStatus};
use sync_types::Timestamp;
use thiserror::Error;
use tokio::sync::watch;

use crate::error::ClientError;
use crate::storage::{keys, validate_key};
use crate::store::{Hydration, StoreError, Syncable};

/// Aggregate plaintext snapshot: one slice per enabled store, keyed by name.
pub type RegistrySnapshot = BTreeMap<String, Value>;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A store with this name is already registered.
    #[error("duplicate store name: {0}")]
    DuplicateStore(String),

    /// The name cannot be used as a storage key.
    #[error("invalid store name: {0:?}")]
    InvalidStoreName(String),

    /// A store could not export its state.
    #[error("store `{store}` failed to export: {source}")]
    Export {
        /// Store name.
        store: String,
        /// Underlying error.
        #[source]
        source: StoreError,
    },
}

/// Per-store results of [`Registry::hydrate_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrateSummary {
    /// Outcome per known store present in the snapshot.
    pub stores: BTreeMap<String, Hydration>,
    /// Snapshot keys with no registered store.
    pub unknown: Vec<String>,
}

impl HydrateSummary {
    /// Every entity or slice that was skipped, as taxonomy errors.
    pub fn malformed(&self) -> impl Iterator<Item = ClientError> + '_ {
        self.stores.iter().flat_map(|(store, hydration)| {
            let errors: Vec<ClientError> = match hydration {
                Hydration::Merged(report) => report
                    .skipped
                    .iter()
                    .map(|skipped| ClientError::MalformedEntity {
                        store: store.clone(),
                        key: skipped.key.clone(),
                        reason: skipped.reason.clone(),
                    })
                    .collect(),
                Hydration::Rejected(reason) => vec![ClientError::MalformedEntity {
                    store: store.clone(),
                    key: "*".into(),
                    reason: reason.clone(),
                }],
                Hydration::Disabled => Vec::new(),
            };
            errors
        })
    }

    /// Whether any store changed.
    pub fn changed(&self) -> bool {
        self.stores
            .values()
            .any(|h| h.report().is_some_and(|r| r.changed()))
    }
}

/// Registered stores plus the observable sync status.
pub struct Registry {
    stores: Vec<Arc<dyn Syncable>>,
    status: watch::Sender<SyncStatus>,
}

impl Registry {
    /// Create an empty registry with status `Idle`.
    pub fn new() -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            stores: Vec::new(),
            status,
        }
    }

    /// Add a store.
    ///
    /// Names must be unique and use only `[A-Za-z0-9._-]`, since each store
    /// is persisted under `store.<name>`.
    pub fn register(&mut self, store: Arc<dyn Syncable>) -> Result<(), RegistryError> {
        if store.name().is_empty() || validate_key(&keys::store(store.name())).is_err() {
            return Err(RegistryError::InvalidStoreName(store.name().to_string()));
        }
        if self.stores.iter().any(|s| s.name() == store.name()) {
            return Err(RegistryError::DuplicateStore(store.name().to_string()));
        }
        tracing::debug!(store = %store.name(), "registered store");
        self.stores.push(store);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_store(mut self, store: Arc<dyn Syncable>) -> Result<Self, RegistryError> {
        self.register(store)?;
        Ok(self)
    }

    /// Look up a registered store by name.
    pub fn store(&self, name: &str) -> Option<&Arc<dyn Syncable>> {
        self.stores.iter().find(|s| s.name() == name)
    }

    /// Names of all registered stores, in registration order.
    pub fn store_names(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.name()).collect()
    }

    /// Snapshot of every enabled store. Disabled stores are omitted.
    pub fn get_all_store_states(&self) -> Result<RegistrySnapshot, RegistryError> {
        let mut snapshot = RegistrySnapshot::new();
        for store in self.stores.iter().filter(|s| s.is_sync_enabled()) {
            let state = store.get_snapshot().map_err(|source| RegistryError::Export {
                store: store.name().to_string(),
                source,
            })?;
            snapshot.insert(store.name().to_string(), state);
        }
        Ok(snapshot)
    }

    /// Hand each slice to the store of the same name.
    ///
    /// Unknown keys are ignored. One store rejecting its slice never stops
    /// the others from merging.
    pub fn hydrate_all(&self, snapshot: &RegistrySnapshot) -> HydrateSummary {
        let mut summary = HydrateSummary::default();
        for (name, slice) in snapshot {
            match self.store(name) {
                Some(store) => {
                    summary.stores.insert(name.clone(), store.hydrate(slice));
                }
                None => {
                    tracing::debug!(store = %name, "ignoring slice for unknown store");
                    summary.unknown.push(name.clone());
                }
            }
        }
        summary
    }

    /// Drop expired tombstones from every store, enabled or not.
    pub fn purge_tombstones(&self, now: Timestamp, retention: Duration) -> usize {
        let purged: usize = self
            .stores
            .iter()
            .map(|s| s.purge_tombstones(now, retention))
            .sum();
        if purged > 0 {
            tracing::info!(purged, "purged expired tombstones");
        }
        purged
    }

    /// Replace the published status.
    pub fn set_sync_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    /// Feed a lifecycle event through the status state machine and publish
    /// the result. Returns the new status.
    pub fn apply_status_event(&self, event: StatusEvent) -> SyncStatus {
        let next = self.sync_status().on_event(event);
        self.status.send_replace(next.clone());
        next
    }

    /// Current status.
    pub fn sync_status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("stores", &self.store_names())
            .field("status", &*self.status.borrow())
            .finish()
    }
}
