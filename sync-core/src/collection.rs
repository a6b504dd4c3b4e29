//! Entity collection - the in-memory state of one domain store.
//!
//! A collection maps entity ids to records (tombstones included) and, for
//! order-sensitive stores, keeps an ordered list of the active ids.
//!
//! Invariant: the order list holds every active id exactly once and nothing
//! else. Every mutation here and every merge in [`crate::merge`] preserves it.
//!
//! Local mutations take the current time explicitly so the rules can be
//! tested without a clock.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use sync_types::{Entity, EntityId, Timestamp};
use thiserror::Error;

use crate::merge::reconcile_order;
use crate::retention::is_expired;

/// Errors from local mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Entity ids must be non-empty.
    #[error("entity id must not be empty")]
    EmptyId,

    /// An entity (live or tombstoned) already uses this id.
    #[error("entity already exists: {0}")]
    AlreadyExists(EntityId),

    /// No entity with this id.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// The entity was deleted; tombstones cannot be edited.
    #[error("entity is deleted: {0}")]
    Tombstoned(EntityId),

    /// Reordering requested on a store without an order list.
    #[error("store is not order-sensitive")]
    Unordered,

    /// The proposed order is not a permutation of the active ids.
    #[error("invalid order: {0}")]
    InvalidOrder(String),
}

/// The full state of one store: records keyed by id plus optional order.
///
/// Serializes to the exported store state:
/// `{ "entities": { id: entity, ... }, "order": [id, ...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection<T> {
    entities: BTreeMap<EntityId, Entity<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order: Option<Vec<EntityId>>,
}

impl<T> Collection<T> {
    /// Create an empty collection without an order list.
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            order: None,
        }
    }

    /// Create an empty order-sensitive collection.
    pub fn ordered() -> Self {
        Self {
            entities: BTreeMap::new(),
            order: Some(Vec::new()),
        }
    }

    pub(crate) fn from_parts(
        entities: BTreeMap<EntityId, Entity<T>>,
        order: Option<Vec<EntityId>>,
    ) -> Self {
        Self { entities, order }
    }

    /// Whether this collection keeps an order list.
    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    /// Number of records, tombstones included.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether there are no records at all.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Look up a record (live or tombstoned).
    pub fn get(&self, id: &EntityId) -> Option<&Entity<T>> {
        self.entities.get(id)
    }

    /// All records, tombstones included, by id.
    pub fn entities(&self) -> impl Iterator<Item = &Entity<T>> {
        self.entities.values()
    }

    pub(crate) fn entity_map(&self) -> &BTreeMap<EntityId, Entity<T>> {
        &self.entities
    }

    /// The order list, if this collection is order-sensitive.
    pub fn order(&self) -> Option<&[EntityId]> {
        self.order.as_deref()
    }

    /// Live records: in list order for ordered collections, by id otherwise.
    pub fn active(&self) -> Vec<&Entity<T>> {
        match &self.order {
            Some(order) => order.iter().filter_map(|id| self.entities.get(id)).collect(),
            None => self.entities.values().filter(|e| e.is_active()).collect(),
        }
    }

    /// Create a new live record. Ordered collections list it first.
    pub fn insert(
        &mut self,
        id: EntityId,
        data: T,
        now: Timestamp,
    ) -> Result<&Entity<T>, CollectionError> {
        if id.is_empty() {
            return Err(CollectionError::EmptyId);
        }
        if self.entities.contains_key(&id) {
            return Err(CollectionError::AlreadyExists(id));
        }

        if let Some(order) = self.order.as_mut() {
            order.insert(0, id.clone());
        }
        let entity = Entity::new(id.clone(), data, now);
        Ok(self.entities.entry(id).or_insert(entity))
    }

    /// Replace the domain fields of a live record and bump `updatedAt`.
    ///
    /// Tombstoned records are rejected.
    pub fn update(
        &mut self,
        id: &EntityId,
        data: T,
        now: Timestamp,
    ) -> Result<&Entity<T>, CollectionError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| CollectionError::NotFound(id.clone()))?;
        if entity.is_tombstone() {
            return Err(CollectionError::Tombstoned(id.clone()));
        }

        entity.data = data;
        entity.updated_at = now;
        Ok(entity)
    }

    /// Soft-delete a record: `deletedAt = updatedAt = now`.
    ///
    /// Returns `Ok(false)` without touching anything if the record is
    /// already a tombstone.
    pub fn delete(&mut self, id: &EntityId, now: Timestamp) -> Result<bool, CollectionError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| CollectionError::NotFound(id.clone()))?;
        if entity.is_tombstone() {
            return Ok(false);
        }

        entity.deleted_at = Some(now);
        entity.updated_at = now;
        if let Some(order) = self.order.as_mut() {
            order.retain(|o| o != id);
        }
        Ok(true)
    }

    /// Replace the order list with a permutation of the active ids.
    pub fn reorder(&mut self, ids: Vec<EntityId>) -> Result<(), CollectionError> {
        let current = self.order.as_ref().ok_or(CollectionError::Unordered)?;

        if ids.len() != current.len() {
            return Err(CollectionError::InvalidOrder(format!(
                "expected {} ids, got {}",
                current.len(),
                ids.len()
            )));
        }
        let mut proposed = ids.clone();
        proposed.sort();
        proposed.dedup();
        let mut expected = current.clone();
        expected.sort();
        if proposed != expected {
            return Err(CollectionError::InvalidOrder(
                "ids must be a permutation of the active entities".into(),
            ));
        }

        self.order = Some(ids);
        Ok(())
    }

    /// Physically drop tombstones older than `retention`.
    ///
    /// This is a local sweep and is never propagated to other devices.
    /// Returns the purged ids.
    pub fn purge_tombstones(&mut self, now: Timestamp, retention: Duration) -> Vec<EntityId> {
        let expired: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| is_expired(e, now, retention))
            .map(|e| e.id.clone())
            .collect();

        for id in &expired {
            self.entities.remove(id);
        }
        expired
    }

    /// Restore the order-list invariant on state read from outside.
    ///
    /// Unknown, tombstoned and repeated ids are dropped; unlisted active ids
    /// are prepended newest first. Returns whether the list changed.
    pub fn normalize_order(&mut self) -> bool {
        let Some(order) = &self.order else {
            return false;
        };
        let normalized = reconcile_order(order, &[], &self.entities);
        if normalized == *order {
            return false;
        }
        self.order = Some(normalized);
        true
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> Collection<T> {
    /// Export the full state (tombstones included) as a JSON value.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
