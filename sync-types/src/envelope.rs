//! SnapshotEnvelope - the stored wrapper for an encrypted snapshot.

use serde::{Deserialize, Serialize};

use crate::WireError;

/// Current envelope version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Nonce size for XChaCha20-Poly1305 (192 bits = 24 bytes).
pub const NONCE_SIZE: usize = 24;

/// The envelope wraps one encrypted snapshot with what is needed to open it.
///
/// This is the only form in which snapshot content leaves the device. The
/// relay stores the encoded bytes without being able to read the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    /// Envelope version (currently 1)
    pub version: u8,
    /// Encryption nonce (24 bytes for XChaCha20), fresh per envelope
    pub nonce: [u8; NONCE_SIZE],
    /// AEAD ciphertext including the Poly1305 tag
    pub ciphertext: Vec<u8>,
}

impl SnapshotEnvelope {
    /// Create a current-version envelope.
    pub fn new(nonce: [u8; NONCE_SIZE], ciphertext: Vec<u8>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            nonce,
            ciphertext,
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        rmp_serde::to_vec(self).map_err(WireError::Serialization)
    }

    /// Deserialize from MessagePack bytes, rejecting unknown versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let envelope: Self = rmp_serde::from_slice(bytes).map_err(WireError::Deserialization)?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(WireError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }
}
