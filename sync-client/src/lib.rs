//! # sync-client
//!
//! Client library for keepsync end-to-end encrypted multi-device sync.
//!
//! This is the main library that applications use to sync data.
//!
//! ## Features
//!
//! - **E2E Encryption**: XChaCha20-Poly1305 with 192-bit nonces; the relay
//!   only ever stores ciphertext
//! - **Last-Write-Wins Merge**: per-entity conflict resolution with
//!   tombstones, via sync-core
//! - **Relay Abstraction**: pluggable relay (mock, timeouts)
//! - **Single-Flight Cycles**: pull always precedes push; overlapping
//!   triggers are dropped
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{DeviceIdentity, EntityStore, FileStore, Registry, SyncEngine, SyncType};
//!
//! let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(data_dir).await?);
//! let identity = DeviceIdentity::load_or_generate(storage.as_ref()).await?;
//!
//! let notes = Arc::new(EntityStore::<Note>::new("notes"));
//! let registry = Arc::new(Registry::new().with_store(notes.clone())?);
//! let engine = SyncEngine::new(identity, registry, Arc::new(relay), storage);
//!
//! engine.create_workspace().await?;
//! notes.add("n1", Note { body: "hello".into() })?;
//! engine.sync(SyncType::Both).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod identity;
pub mod observer;
pub mod registry;
pub mod relay;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod transport;
pub mod workspace;

pub use config::{ConfigError, SyncSettings};
pub use crypto::{
    decrypt_snapshot, decrypt_snapshot_hex, encrypt_snapshot, encrypt_snapshot_hex, CryptoError,
    DeviceKey, SnapshotCipher, KEY_SIZE,
};
pub use engine::{CycleError, CycleOutcome, CycleReport, SyncEngine};
pub use error::ClientError;
pub use identity::DeviceIdentity;
pub use observer::{NoopObserver, SyncObserver, TracingObserver};
pub use registry::{HydrateSummary, Registry, RegistryError, RegistrySnapshot};
pub use relay::{MockRelay, Relay, RelayError, RelayOp, TimeoutRelay};
pub use scheduler::{spawn_purge_task, spawn_sync_task};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{EntityStore, Hydration, StoreError, Syncable};
pub use transport::{PullOutcome, SnapshotTransport};
pub use workspace::WorkspaceDirectory;

pub use sync_core::{SyncStatus, SyncType};
