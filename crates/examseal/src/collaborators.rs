//! Interfaces to the systems that hand out content and public keys.
//!
//! These sit outside the device boundary and are supplied by the embedding
//! application. Implementations return `anyhow::Result` since their failure
//! modes (network, database, auth) are not ours to enumerate.

use std::collections::HashMap;

use async_trait::async_trait;
use examseal_core::{ContentId, DeviceId, DeviceRegistration};
use examseal_crypto::ContentEnvelope;
use tokio::sync::RwLock;

/// Where devices register the public key content is wrapped for.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Record or replace a device's registration.
    async fn register(&self, registration: &DeviceRegistration) -> anyhow::Result<()>;

    /// The exported public key registered for `device_id`.
    async fn public_key(&self, device_id: &DeviceId) -> anyhow::Result<Option<String>>;
}

/// Where sealed content is stored for devices to fetch.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn put_envelope(
        &self,
        content_id: &ContentId,
        envelope: &ContentEnvelope,
    ) -> anyhow::Result<()>;

    async fn get_envelope(&self, content_id: &ContentId) -> anyhow::Result<Option<ContentEnvelope>>;
}

/// In-memory device directory.
#[derive(Default)]
pub struct MemoryDirectory {
    devices: RwLock<HashMap<DeviceId, DeviceRegistration>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget a device. Returns whether it was registered.
    pub async fn unregister(&self, device_id: &DeviceId) -> bool {
        self.devices.write().await.remove(device_id).is_some()
    }

    pub async fn get(&self, device_id: &DeviceId) -> Option<DeviceRegistration> {
        self.devices.read().await.get(device_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}

#[async_trait]
impl DeviceDirectory for MemoryDirectory {
    async fn register(&self, registration: &DeviceRegistration) -> anyhow::Result<()> {
        self.devices
            .write()
            .await
            .insert(registration.device_id.clone(), registration.clone());
        Ok(())
    }

    async fn public_key(&self, device_id: &DeviceId) -> anyhow::Result<Option<String>> {
        Ok(self
            .devices
            .read()
            .await
            .get(device_id)
            .map(|r| r.public_key.clone()))
    }
}

/// In-memory content repository.
///
/// Stores envelopes as JSON text, the way a remote store would receive them.
#[derive(Default)]
pub struct MemoryContentRepository {
    envelopes: RwLock<HashMap<ContentId, String>>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored text for a content id.
    pub async fn raw(&self, content_id: &ContentId) -> Option<String> {
        self.envelopes.read().await.get(content_id).cloned()
    }

    /// Overwrite stored text, bypassing encoding.
    pub async fn put_raw(&self, content_id: ContentId, text: impl Into<String>) {
        self.envelopes.write().await.insert(content_id, text.into());
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn put_envelope(
        &self,
        content_id: &ContentId,
        envelope: &ContentEnvelope,
    ) -> anyhow::Result<()> {
        let text = envelope.to_json()?;
        self.envelopes
            .write()
            .await
            .insert(content_id.clone(), text);
        Ok(())
    }

    async fn get_envelope(&self, content_id: &ContentId) -> anyhow::Result<Option<ContentEnvelope>> {
        let text = self.envelopes.read().await.get(content_id).cloned();
        Ok(text
            .map(|text| ContentEnvelope::from_json(&text))
            .transpose()?)
    }
}
