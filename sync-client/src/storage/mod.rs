//! Local key-value storage for device state.
//!
//! Everything keepsync keeps on a device lives behind [`KeyValueStore`]:
//! the device key and id, the cached workspace id, the last encrypted
//! snapshot, and each store's persisted state. Keys are listed in [`keys`].
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`] for tests and ephemeral sessions
//! - [`FileStore`] for one-file-per-key storage under a private directory

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Hex form of the device key.
    pub const DEVICE_KEY: &str = "device.key";
    /// Displayable device id.
    pub const DEVICE_ID: &str = "device.id";
    /// Id of the joined or created workspace.
    pub const WORKSPACE_ID: &str = "workspace.id";
    /// Scratch slot for the most recent encrypted export.
    pub const LATEST_SNAPSHOT: &str = "snapshot.latest";

    /// Key holding the persisted state of the named store.
    pub fn store(name: &str) -> String {
        format!("store.{}", name)
    }
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters the backend cannot store.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// A stored value could not be read back.
    #[error("corrupt value under `{key}`: {reason}")]
    Corrupt {
        /// Storage key.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Async key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a value. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Read a value as UTF-8 text.
    async fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.get(key).await? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}

/// Check that a key only uses `[A-Za-z0-9._-]` and is not a dot path.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
