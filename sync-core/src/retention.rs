//! Tombstone retention.
//!
//! Deleted entities are kept as tombstones so the deletion reaches every
//! device through normal snapshots. After the retention window a local sweep
//! drops them. The sweep itself is never propagated.

use std::time::Duration;
use sync_types::{Entity, Timestamp, DAY_MILLIS};

/// Default retention window for tombstones (30 days).
pub const DEFAULT_TOMBSTONE_RETENTION: Duration = Duration::from_millis(30 * DAY_MILLIS);

/// Whether `entity` is a tombstone whose retention window has elapsed.
///
/// A tombstone deleted at `d` expires once `now - d >= retention`.
pub fn is_expired<T>(entity: &Entity<T>, now: Timestamp, retention: Duration) -> bool {
    match entity.deleted_at {
        Some(deleted_at) => now.since(deleted_at) >= retention,
        None => false,
    }
}
