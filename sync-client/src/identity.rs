//! Device identity: the workspace key plus a displayable device id.
//!
//! The key encrypts every snapshot and is shared by all devices of a
//! workspace. The device id is an independent random value used for relay
//! membership; it reveals nothing about the key.

use sync_types::DeviceId;

use crate::crypto::DeviceKey;
use crate::error::ClientError;
use crate::storage::{keys, KeyValueStore};

/// This device's key and id.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    device_id: DeviceId,
    key: DeviceKey,
}

impl DeviceIdentity {
    /// Load the persisted identity, generating and persisting whichever half
    /// is missing.
    ///
    /// A stored key or id that cannot be parsed is an error; it is never
    /// replaced silently, since a new key orphans all encrypted history.
    pub async fn load_or_generate(storage: &dyn KeyValueStore) -> Result<Self, ClientError> {
        let key = match load_key(storage).await? {
            Some(key) => key,
            None => {
                let key = DeviceKey::generate();
                storage
                    .set(keys::DEVICE_KEY, key.to_hex().as_bytes())
                    .await?;
                tracing::info!("generated new device key");
                key
            }
        };

        let device_id = match load_device_id(storage).await? {
            Some(id) => id,
            None => {
                let id = DeviceId::random();
                storage
                    .set(keys::DEVICE_ID, id.to_string().as_bytes())
                    .await?;
                tracing::info!(device_id = %id, "generated new device id");
                id
            }
        };

        Ok(Self { device_id, key })
    }

    /// Load the persisted identity. `Ok(None)` if either half is missing.
    pub async fn load(storage: &dyn KeyValueStore) -> Result<Option<Self>, ClientError> {
        let key = load_key(storage).await?;
        let device_id = load_device_id(storage).await?;
        Ok(match (key, device_id) {
            (Some(key), Some(device_id)) => Some(Self { device_id, key }),
            _ => None,
        })
    }

    /// Build an identity in memory without touching storage.
    pub fn from_parts(device_id: DeviceId, key: DeviceKey) -> Self {
        Self { device_id, key }
    }

    /// Replace the key with a fresh random one and persist it.
    ///
    /// Destructive: snapshots encrypted under the old key can no longer be
    /// read. Only call this on an explicit user request.
    pub async fn regenerate_key(&mut self, storage: &dyn KeyValueStore) -> Result<(), ClientError> {
        let key = DeviceKey::generate();
        storage
            .set(keys::DEVICE_KEY, key.to_hex().as_bytes())
            .await?;
        self.key = key;
        tracing::warn!(
            device_id = %self.device_id,
            "device key regenerated; existing encrypted snapshots are unreadable"
        );
        Ok(())
    }

    /// Install a key received from another device of the workspace.
    pub async fn import_key_hex(
        &mut self,
        key_hex: &str,
        storage: &dyn KeyValueStore,
    ) -> Result<(), ClientError> {
        let key = DeviceKey::from_hex(key_hex)?;
        storage
            .set(keys::DEVICE_KEY, key.to_hex().as_bytes())
            .await?;
        self.key = key;
        tracing::info!(device_id = %self.device_id, "imported device key");
        Ok(())
    }

    /// Hex form of the key, for the explicit pairing flow only.
    pub fn export_key_hex(&self) -> zeroize::Zeroizing<String> {
        self.key.to_hex()
    }

    /// The displayable device id.
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// The workspace key.
    pub fn key(&self) -> &DeviceKey {
        &self.key
    }
}

async fn load_key(storage: &dyn KeyValueStore) -> Result<Option<DeviceKey>, ClientError> {
    match storage.get_string(keys::DEVICE_KEY).await? {
        None => Ok(None),
        Some(text) => {
            let text = zeroize::Zeroizing::new(text);
            DeviceKey::from_hex(&text)
                .map(Some)
                .map_err(|e| ClientError::Identity(format!("stored device key: {}", e)))
        }
    }
}

async fn load_device_id(storage: &dyn KeyValueStore) -> Result<Option<DeviceId>, ClientError> {
    match storage.get_string(keys::DEVICE_ID).await? {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ClientError::Identity(format!("stored device id: {}", e))),
    }
}
