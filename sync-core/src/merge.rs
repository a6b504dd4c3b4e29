//! Last-write-wins merge of an incoming store slice into local state.
//!
//! Rules, per incoming entity:
//! - absent locally → inserted as-is, tombstones included
//! - present locally → replaced wholesale iff `incoming.updatedAt > local.updatedAt`;
//!   on a tie or an older incoming record the local one is kept untouched
//!
//! The merge never mutates the local collection. It builds a fresh one and
//! returns it, so callers can swap it in atomically or drop it.
//!
//! A single malformed entity is skipped and reported; the rest of the batch
//! still merges. A slice that is not shaped like a store export at all is
//! rejected as a whole.
//!
//! # Order lists
//!
//! [`reconcile_order`] is a best-effort heuristic. Two devices reordering the
//! same list concurrently are not guaranteed to converge on one order. Entity
//! contents are unaffected by this.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use sync_types::{Entity, EntityId};
use thiserror::Error;

use crate::collection::Collection;

/// How one incoming record relates to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Not present locally; take it.
    Insert,
    /// Strictly newer than local; take it wholesale.
    Replace,
    /// Same age or older; keep local.
    Keep,
}

/// Decide the LWW outcome for one incoming record.
pub fn resolve<T>(local: Option<&Entity<T>>, incoming: &Entity<T>) -> Resolution {
    match local {
        None => Resolution::Insert,
        Some(local) if incoming.updated_at > local.updated_at => Resolution::Replace,
        Some(_) => Resolution::Keep,
    }
}

/// The incoming slice could not be read as a store export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// Wrong overall shape; nothing was merged.
    #[error("malformed store slice: {0}")]
    MalformedSlice(String),
}

/// An incoming entity that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntity {
    /// Map key the entity was found under.
    pub key: String,
    /// Why it was rejected.
    pub reason: String,
}

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids that were new locally.
    pub inserted: Vec<EntityId>,
    /// Ids replaced by a strictly newer record.
    pub replaced: Vec<EntityId>,
    /// Number of incoming records that lost to local state.
    pub kept: usize,
    /// Malformed incoming records.
    pub skipped: Vec<SkippedEntity>,
    /// The incoming order list was unreadable and treated as absent.
    pub order_ignored: bool,
}

impl MergeReport {
    /// Whether the merge changed any record.
    pub fn changed(&self) -> bool {
        !self.inserted.is_empty() || !self.replaced.is_empty()
    }
}

/// Merge an exported store slice into a copy of `local`.
///
/// `incoming` must look like `{ "entities": { id: entity, ... }, "order": [...]? }`.
pub fn merge_slice<T>(
    local: &Collection<T>,
    incoming: &Value,
) -> Result<(Collection<T>, MergeReport), MergeError>
where
    T: DeserializeOwned + Clone,
{
    let slice = incoming
        .as_object()
        .ok_or_else(|| MergeError::MalformedSlice("expected an object".into()))?;
    let entities = match slice.get("entities") {
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(MergeError::MalformedSlice(
                "`entities` must be a map".into(),
            ))
        }
        None => return Err(MergeError::MalformedSlice("missing `entities`".into())),
    };

    let mut merged = local.entity_map().clone();
    let mut report = MergeReport::default();

    for (key, raw) in entities {
        let entity: Entity<T> = match parse_entity(key, raw) {
            Ok(entity) => entity,
            Err(reason) => {
                report.skipped.push(SkippedEntity {
                    key: key.clone(),
                    reason,
                });
                continue;
            }
        };

        match resolve(merged.get(&entity.id), &entity) {
            Resolution::Insert => {
                report.inserted.push(entity.id.clone());
                merged.insert(entity.id.clone(), entity);
            }
            Resolution::Replace => {
                report.replaced.push(entity.id.clone());
                merged.insert(entity.id.clone(), entity);
            }
            Resolution::Keep => report.kept += 1,
        }
    }

    let order = match local.order() {
        None => None,
        Some(local_order) => {
            let incoming_order = match slice.get("order") {
                None | Some(Value::Null) => Vec::new(),
                Some(raw) => match serde_json::from_value::<Vec<EntityId>>(raw.clone()) {
                    Ok(order) => order,
                    Err(_) => {
                        report.order_ignored = true;
                        Vec::new()
                    }
                },
            };
            Some(reconcile_order(local_order, &incoming_order, &merged))
        }
    };

    Ok((Collection::from_parts(merged, order), report))
}

fn parse_entity<T: DeserializeOwned>(key: &str, raw: &Value) -> Result<Entity<T>, String> {
    let entity: Entity<T> = serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
    if entity.id.is_empty() {
        return Err("empty id".into());
    }
    if entity.id.as_str() != key {
        return Err(format!("id `{}` does not match key", entity.id));
    }
    Ok(entity)
}

/// Rebuild the order list after a merge.
///
/// Ids that are no longer active are dropped. Whichever of the local and
/// incoming lists covers more of the active set becomes the base (ties keep
/// local). Active ids missing from the base are prepended: first those from
/// the other list in its order, then any active ids neither list mentions,
/// newest first.
pub fn reconcile_order<T>(
    local_order: &[EntityId],
    incoming_order: &[EntityId],
    entities: &BTreeMap<EntityId, Entity<T>>,
) -> Vec<EntityId> {
    let local_active = active_only(local_order, entities);
    let incoming_active = active_only(incoming_order, entities);

    let (base, other) = if incoming_active.len() > local_active.len() {
        (incoming_active, local_active)
    } else {
        (local_active, incoming_active)
    };

    let mut seen: BTreeSet<EntityId> = base.iter().cloned().collect();
    let mut result = Vec::with_capacity(base.len());

    for id in other {
        if seen.insert(id.clone()) {
            result.push(id);
        }
    }

    let mut unlisted: Vec<&Entity<T>> = entities
        .values()
        .filter(|e| e.is_active() && !seen.contains(&e.id))
        .collect();
    unlisted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    result.extend(unlisted.into_iter().map(|e| e.id.clone()));

    result.extend(base);
    result
}

fn active_only<T>(order: &[EntityId], entities: &BTreeMap<EntityId, Entity<T>>) -> Vec<EntityId> {
    let mut seen = BTreeSet::new();
    order
        .iter()
        .filter(|id| entities.get(*id).is_some_and(|e| e.is_active()))
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}
