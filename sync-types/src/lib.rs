//! # sync-types
//!
//! Record and envelope types for keepsync.
//!
//! This crate provides the foundational types used across all keepsync crates:
//! - [`DeviceId`], [`WorkspaceId`], [`SnapshotId`], [`EntityId`], [`InviteCode`] - Identifiers
//! - [`Timestamp`], [`Entity`] - Entity records with tombstone markers
//! - [`WorkspaceRecord`], [`SnapshotRecord`], [`NewSnapshot`] - Relay record shapes
//! - [`SnapshotEnvelope`] - Encrypted snapshot wrapper stored by the relay
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entity;
mod envelope;
mod error;
mod ids;
mod records;

pub use entity::{Entity, Timestamp, DAY_MILLIS};
pub use envelope::{SnapshotEnvelope, ENVELOPE_VERSION, NONCE_SIZE};
pub use error::WireError;
pub use ids::{DeviceId, EntityId, InviteCode, SnapshotId, WorkspaceId};
pub use records::{NewSnapshot, SnapshotRecord, WorkspaceRecord};
