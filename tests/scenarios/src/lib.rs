//! # keepsync-scenarios
//!
//! Multi-device scenario tests for keepsync.
//!
//! Every scenario runs several simulated devices against one shared
//! in-memory relay:
//! - Conflicting edits across devices resolve by last-write-wins
//! - Joining a workspace never uploads a snapshot
//! - Tombstones survive the retention window and are purged after it
//! - Stores opted out of sync are never touched by incoming snapshots
//! - Partial failures, overlapping triggers and wrong keys
//!
//! Set `RUST_LOG=keepsync_client=debug` to see engine logs for a
//! failing scenario.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod harness;
