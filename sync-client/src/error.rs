//! Client error taxonomy.
//!
//! Every fallible client operation returns [`ClientError`]. Lower layers keep
//! their own error enums and convert in here; relay and crypto failures are
//! folded into the five user-facing categories (network, authorization,
//! decryption, remote, malformed entity).

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::registry::RegistryError;
use crate::relay::RelayError;
use crate::storage::StorageError;
use crate::store::StoreError;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay could not be reached or did not answer in time.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The relay or the workspace refused this device.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// A snapshot could not be decrypted with the device key.
    /// No details provided to prevent oracle attacks.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The relay answered with an error.
    #[error("remote error {code}: {message}")]
    Remote {
        /// Status code reported by the relay.
        code: u16,
        /// Message reported by the relay.
        message: String,
    },

    /// An incoming entity or store slice could not be read.
    ///
    /// Recovered inside hydration; reported to observers, never returned
    /// from a cycle.
    #[error("malformed entity `{key}` in store `{store}`: {reason}")]
    MalformedEntity {
        /// Store the entity was addressed to.
        store: String,
        /// Map key of the entity, or `*` for a whole slice.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Local storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Store registration failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A local store mutation was rejected.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The stored device identity is unusable.
    #[error("identity error: {0}")]
    Identity(String),

    /// No workspace has been created or joined on this device.
    #[error("no workspace")]
    NoWorkspace,

    /// There is no exported snapshot to push.
    #[error("nothing to push")]
    NothingToPush,
}

impl ClientError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_))
    }
}

impl From<RelayError> for ClientError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Unavailable(reason) => Self::NetworkUnavailable(reason),
            RelayError::Unauthorized(reason) => Self::Authorization(reason),
            RelayError::NotFound(what) => Self::Remote {
                code: 404,
                message: format!("not found: {}", what),
            },
            RelayError::Remote { code, message } => Self::Remote { code, message },
        }
    }
}

impl From<CryptoError> for ClientError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => Self::DecryptionFailed,
            CryptoError::EncryptionFailed(reason) => Self::Encryption(reason),
            CryptoError::InvalidKey(reason) => Self::Identity(reason),
            CryptoError::Serialization(reason) => Self::Serialization(reason),
        }
    }
}
