//! Syncable domain stores.
//!
//! A store owns one [`Collection`] of entities and exposes it to the sync
//! engine through the [`Syncable`] trait: export the full state, merge an
//! incoming slice, and honour a per-store "sync enabled" flag.
//!
//! [`EntityStore`] is the stock implementation for any serde payload type.
//! Merges are built on a copy of the state and swapped in under the write
//! lock, so readers never observe a half-merged store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use sync_core::{merge_slice, Collection, CollectionError, MergeError, MergeReport};
use sync_types::{Entity, EntityId, Timestamp};
use thiserror::Error;

use crate::error::ClientError;
use crate::storage::{keys, KeyValueStore, StorageError};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A local mutation was rejected.
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// State could not be exported.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Outcome of handing a slice to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// Sync is disabled for this store; nothing was read.
    Disabled,
    /// The slice was merged.
    Merged(MergeReport),
    /// The slice as a whole was unreadable; nothing was merged.
    Rejected(String),
}

impl Hydration {
    /// The merge report, if a merge happened.
    pub fn report(&self) -> Option<&MergeReport> {
        match self {
            Self::Merged(report) => Some(report),
            _ => None,
        }
    }
}

/// A store that takes part in sync.
///
/// Implementations must be cheap to call from async code: every method is
/// synchronous and in-memory.
pub trait Syncable: Send + Sync {
    /// Unique name; the key of this store's slice in a snapshot.
    fn name(&self) -> &str;

    /// Full state, tombstones included.
    fn get_snapshot(&self) -> Result<Value, StoreError>;

    /// Merge an incoming slice. A no-op when sync is disabled.
    fn hydrate(&self, incoming: &Value) -> Hydration;

    /// Whether this store takes part in sync.
    fn is_sync_enabled(&self) -> bool;

    /// Opt this store in or out of sync.
    fn set_sync_enabled(&self, enabled: bool);

    /// Drop tombstones older than `retention`. Returns how many were dropped.
    fn purge_tombstones(&self, now: Timestamp, retention: Duration) -> usize;
}

#[derive(Serialize)]
struct PersistedRef<'a, T> {
    sync_enabled: bool,
    state: &'a Collection<T>,
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct Persisted<T> {
    sync_enabled: bool,
    state: Collection<T>,
}

/// A named collection of `T` records.
pub struct EntityStore<T> {
    name: String,
    state: RwLock<Collection<T>>,
    sync_enabled: AtomicBool,
}

impl<T> EntityStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Create an unordered store with sync enabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_collection(name, Collection::new())
    }

    /// Create an order-sensitive store with sync enabled.
    pub fn ordered(name: impl Into<String>) -> Self {
        Self::with_collection(name, Collection::ordered())
    }

    fn with_collection(name: impl Into<String>, collection: Collection<T>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(collection),
            sync_enabled: AtomicBool::new(true),
        }
    }

    /// Builder: set the initial sync flag.
    pub fn with_sync_enabled(self, enabled: bool) -> Self {
        self.sync_enabled.store(enabled, Ordering::SeqCst);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Collection<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collection<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a record stamped with the current time.
    pub fn add(&self, id: impl Into<EntityId>, data: T) -> Result<Entity<T>, StoreError> {
        self.add_at(id, data, Timestamp::now())
    }

    /// Create a record stamped with `now`.
    pub fn add_at(
        &self,
        id: impl Into<EntityId>,
        data: T,
        now: Timestamp,
    ) -> Result<Entity<T>, StoreError> {
        let mut state = self.write();
        Ok(state.insert(id.into(), data, now)?.clone())
    }

    /// Replace a live record's fields, stamped with the current time.
    pub fn update(&self, id: &EntityId, data: T) -> Result<Entity<T>, StoreError> {
        self.update_at(id, data, Timestamp::now())
    }

    /// Replace a live record's fields, stamped with `now`.
    pub fn update_at(&self, id: &EntityId, data: T, now: Timestamp) -> Result<Entity<T>, StoreError> {
        let mut state = self.write();
        Ok(state.update(id, data, now)?.clone())
    }

    /// Soft-delete a record. Returns `false` if it was already deleted.
    pub fn delete(&self, id: &EntityId) -> Result<bool, StoreError> {
        self.delete_at(id, Timestamp::now())
    }

    /// Soft-delete a record at `now`.
    pub fn delete_at(&self, id: &EntityId, now: Timestamp) -> Result<bool, StoreError> {
        let mut state = self.write();
        Ok(state.delete(id, now)?)
    }

    /// Look up a record, tombstones included.
    pub fn get(&self, id: &EntityId) -> Option<Entity<T>> {
        self.read().get(id).cloned()
    }

    /// Live records, in list order for ordered stores.
    pub fn list_active(&self) -> Vec<Entity<T>> {
        self.read().active().into_iter().cloned().collect()
    }

    /// Replace the order list with a permutation of the active ids.
    pub fn reorder(&self, ids: Vec<EntityId>) -> Result<(), StoreError> {
        let mut state = self.write();
        Ok(state.reorder(ids)?)
    }

    /// A copy of the whole collection.
    pub fn state(&self) -> Collection<T> {
        self.read().clone()
    }

    /// Save the collection and the sync flag under `store.<name>`.
    pub async fn persist(&self, storage: &dyn KeyValueStore) -> Result<(), ClientError> {
        let bytes = {
            let state = self.read();
            serde_json::to_vec(&PersistedRef {
                sync_enabled: self.is_sync_enabled(),
                state: &*state,
            })
            .map_err(|e| ClientError::Serialization(e.to_string()))?
        };
        storage.set(&keys::store(&self.name), &bytes).await?;
        Ok(())
    }

    /// Load previously persisted state, replacing the in-memory collection.
    ///
    /// Returns `false` if nothing was persisted for this store.
    pub async fn restore(&self, storage: &dyn KeyValueStore) -> Result<bool, ClientError> {
        let key = keys::store(&self.name);
        let Some(bytes) = storage.get(&key).await? else {
            return Ok(false);
        };

        let persisted: Persisted<T> =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        let mut state = self.write();
        if persisted.state.is_ordered() != state.is_ordered() {
            return Err(StorageError::Corrupt {
                key,
                reason: "order list presence does not match store kind".into(),
            }
            .into());
        }
        *state = persisted.state;
        if state.normalize_order() {
            tracing::warn!(store = %self.name, "repaired persisted order list");
        }
        self.sync_enabled
            .store(persisted.sync_enabled, Ordering::SeqCst);
        tracing::debug!(store = %self.name, records = state.len(), "restored store");
        Ok(true)
    }
}

impl<T> Syncable for EntityStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn get_snapshot(&self) -> Result<Value, StoreError> {
        self.read()
            .to_value()
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn hydrate(&self, incoming: &Value) -> Hydration {
        if !self.is_sync_enabled() {
            tracing::debug!(store = %self.name, "sync disabled, ignoring incoming slice");
            return Hydration::Disabled;
        }

        let mut state = self.write();
        match merge_slice(&*state, incoming) {
            Ok((merged, report)) => {
                *state = merged;
                for skipped in &report.skipped {
                    tracing::warn!(
                        store = %self.name,
                        key = %skipped.key,
                        reason = %skipped.reason,
                        "skipped malformed entity"
                    );
                }
                if report.order_ignored {
                    tracing::warn!(store = %self.name, "ignored unreadable order list");
                }
                tracing::debug!(
                    store = %self.name,
                    inserted = report.inserted.len(),
                    replaced = report.replaced.len(),
                    kept = report.kept,
                    "merged slice"
                );
                Hydration::Merged(report)
            }
            Err(MergeError::MalformedSlice(reason)) => {
                tracing::warn!(store = %self.name, %reason, "rejected malformed slice");
                Hydration::Rejected(reason)
            }
        }
    }

    fn is_sync_enabled(&self) -> bool {
        self.sync_enabled.load(Ordering::SeqCst)
    }

    fn set_sync_enabled(&self, enabled: bool) {
        self.sync_enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(store = %self.name, enabled, "sync flag changed");
    }

    fn purge_tombstones(&self, now: Timestamp, retention: Duration) -> usize {
        let purged = self.write().purge_tombstones(now, retention);
        if !purged.is_empty() {
            tracing::debug!(store = %self.name, count = purged.len(), "purged tombstones");
        }
        purged.len()
    }
}

impl<T> std::fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("name", &self.name)
            .field("sync_enabled", &self.sync_enabled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
