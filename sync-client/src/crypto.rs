//! Cryptographic primitives for keepsync.
//!
//! This module provides:
//! - [`DeviceKey`]: the 256-bit secret shared by the devices of a workspace
//! - [`SnapshotCipher`]: XChaCha20-Poly1305 under an HKDF-derived subkey
//! - [`encrypt_snapshot`] / [`decrypt_snapshot`]: the snapshot codec
//!
//! # Security Notes
//!
//! - XChaCha20 uses 192-bit nonces (24 bytes), safe for random generation
//! - Every envelope gets a fresh random nonce
//! - The cipher key is derived via HKDF-SHA256, never the raw device key
//! - A wrong key, a tampered envelope and an unknown envelope version all
//!   fail as [`CryptoError::DecryptionFailed`]

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;
use sync_types::{SnapshotEnvelope, NONCE_SIZE};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Key size for XChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Crypto errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (authentication error).
    /// No details provided to prevent oracle attacks.
    #[error("decryption failed: authentication error")]
    DecryptionFailed,

    /// Key text is not 64 hex characters.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The value could not be encoded, or a decrypted payload did not
    /// have the expected shape.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// The secret symmetric key of a workspace.
///
/// Generated once per device and persisted locally. Every device in a
/// workspace must hold the same key to read each other's snapshots; the key
/// travels between devices only through the explicit pairing flow, never
/// through the relay.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DeviceKey([u8; KEY_SIZE]);

impl DeviceKey {
    /// Generate a cryptographically random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse the 64-character hex form.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(
            hex::decode(text.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        );
        if decoded.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                decoded.len()
            )));
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// The 64-character lowercase hex form.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

// Don't leak the key in debug output
impl std::fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeviceKey([REDACTED])")
    }
}

/// AEAD cipher for snapshot envelopes.
///
/// Holds an encryption subkey derived from the [`DeviceKey`] via
/// HKDF-SHA256, so the raw device key is never used directly as a cipher key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SnapshotCipher {
    encryption_key: [u8; KEY_SIZE],
}

impl SnapshotCipher {
    /// Derive the snapshot cipher for a device key.
    pub fn derive(key: &DeviceKey) -> Self {
        let hkdf = Hkdf::<Sha256>::new(Some(b"keepsync-snapshot-v1"), key.as_bytes());

        let mut encryption_key = [0u8; KEY_SIZE];
        hkdf.expand(b"snapshot-encryption", &mut encryption_key)
            .expect("hkdf expand failed");

        Self { encryption_key }
    }

    /// Encrypt `plaintext` into a fresh envelope with a random 192-bit nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SnapshotEnvelope, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes).expect("getrandom failed");
        let nonce = XNonce::from_slice(&nonce_bytes);

        let cipher = XChaCha20Poly1305::new_from_slice(&self.encryption_key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed("aead encrypt failed".into()))?;

        Ok(SnapshotEnvelope::new(nonce_bytes, ciphertext))
    }

    /// Decrypt and authenticate an envelope.
    pub fn open(&self, envelope: &SnapshotEnvelope) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let nonce = XNonce::from_slice(&envelope.nonce);

        let cipher = XChaCha20Poly1305::new_from_slice(&self.encryption_key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        cipher
            .decrypt(nonce, envelope.ciphertext.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl std::fmt::Debug for SnapshotCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SnapshotCipher {{ encryption_key: [REDACTED] }}")
    }
}

/// Encrypt any serializable value into encoded envelope bytes.
pub fn encrypt_snapshot<T: Serialize>(value: &T, key: &DeviceKey) -> Result<Vec<u8>, CryptoError> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(value).map_err(|e| CryptoError::Serialization(e.to_string()))?,
    );
    let envelope = SnapshotCipher::derive(key).seal(&plaintext)?;
    envelope
        .to_bytes()
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypt encoded envelope bytes back into a value.
///
/// Fails with [`CryptoError::DecryptionFailed`] for a wrong key or any
/// tampering, including an envelope that no longer decodes.
pub fn decrypt_snapshot<T: DeserializeOwned>(bytes: &[u8], key: &DeviceKey) -> Result<T, CryptoError> {
    let envelope = SnapshotEnvelope::from_bytes(bytes).map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = SnapshotCipher::derive(key).open(&envelope)?;
    serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Serialization(e.to_string()))
}

/// [`encrypt_snapshot`] with the key given in hex form.
pub fn encrypt_snapshot_hex<T: Serialize>(value: &T, key_hex: &str) -> Result<Vec<u8>, CryptoError> {
    encrypt_snapshot(value, &DeviceKey::from_hex(key_hex)?)
}

/// [`decrypt_snapshot`] with the key given in hex form.
pub fn decrypt_snapshot_hex<T: DeserializeOwned>(
    bytes: &[u8],
    key_hex: &str,
) -> Result<T, CryptoError> {
    decrypt_snapshot(bytes, &DeviceKey::from_hex(key_hex)?)
}
