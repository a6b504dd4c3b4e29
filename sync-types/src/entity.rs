//! Entity records and timestamps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::EntityId;

/// Milliseconds in one day.
pub const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

/// Wall-clock timestamp in milliseconds since the Unix epoch.
///
/// Used for `createdAt`/`updatedAt`/`deletedAt` and compared directly by
/// last-write-wins merging, so device clock skew is visible to merges.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from milliseconds since the epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Timestamp at the start of the given day (day 0 = epoch).
    pub const fn from_days(days: u64) -> Self {
        Self(days * DAY_MILLIS)
    }

    /// Current system time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// This timestamp shifted forward by `duration`.
    pub fn add(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A record in a domain store.
///
/// Serialized as a single camelCase object with the domain payload `T`
/// flattened next to the sync metadata:
///
/// ```json
/// { "id": "n1", "createdAt": 100, "updatedAt": 200, "title": "Final" }
/// ```
///
/// Once `deleted_at` is set it is only ever cleared by a merge that replaces
/// the whole record with a strictly newer one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity<T> {
    /// Identifier, unique within its store.
    pub id: EntityId,
    /// When the entity was first created.
    pub created_at: Timestamp,
    /// Last local edit or deletion; the LWW comparison key.
    pub updated_at: Timestamp,
    /// Tombstone marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
    /// Domain fields.
    #[serde(flatten)]
    pub data: T,
}

impl<T> Entity<T> {
    /// Create a live entity with `createdAt = updatedAt = now`.
    pub fn new(id: EntityId, data: T, now: Timestamp) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            data,
        }
    }

    /// Whether this record is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this record is live (not deleted).
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
