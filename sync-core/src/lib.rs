//! # sync-core
//!
//! Pure logic for keepsync (no I/O, instant tests).
//!
//! This crate implements the merge rules and state machines for sync
//! without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. Time is always passed in explicitly. This enables:
//! - Instant unit tests (no mocks, no async, no clock)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about conflict resolution
//!
//! The actual I/O (relay, disk, crypto) is performed by `sync-client`, which
//! logs and acts on the reports these functions return.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod merge;
pub mod retention;
pub mod status;

pub use collection::{Collection, CollectionError};
pub use merge::{
    merge_slice, reconcile_order, resolve, MergeError, MergeReport, Resolution, SkippedEntity,
};
pub use retention::{is_expired, DEFAULT_TOMBSTONE_RETENTION};
pub use status::{CycleStep, StatusEvent, SyncStatus, SyncType};
