//! The device manager: one cryptographic identity per installation.
//!
//! Owns the device's RSA key pair and [`DeviceInfo`] through an injected
//! [`Keystore`]. Key objects are re-imported from storage on each call and
//! never cached, so the private key only exists in memory for the duration
//! of one unwrap.
//!
//! Callers sequence [`DeviceManager::initialize_device`] before anything
//! that needs the key pair; there is a single writer per identity and no
//! internal locking.

use std::sync::Arc;

use examseal_core::{DeviceId, DeviceInfo, DeviceKeyRecord, DeviceRegistration};
use examseal_crypto::{
    ContentEnvelope, ContentKey, CryptoError, DeviceKeyPair, DevicePrivateKey, DevicePublicKey,
    EncryptedPayload, WrappedKeyRecord,
};
use examseal_keystore::{Keystore, KeystoreExt};

use crate::clock::{Clock, SystemClock};
use crate::config::DeviceConfig;
use crate::error::{ExamsealError, Result};
use crate::fingerprint::{EnvironmentProbe, SystemEnvironment};

/// Identity and key manager for the local device.
pub struct DeviceManager<K: Keystore> {
    keystore: K,
    config: DeviceConfig,
    environment: Arc<dyn EnvironmentProbe>,
    clock: Arc<dyn Clock>,
}

impl<K: Keystore> DeviceManager<K> {
    /// Create a manager over `keystore`, fingerprinting the running host.
    pub fn new(keystore: K, config: DeviceConfig) -> Self {
        Self {
            keystore,
            config,
            environment: Arc::new(SystemEnvironment),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the environment probe used for first-time fingerprinting.
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentProbe>) -> Self {
        self.environment = environment;
        self
    }

    /// Replace the clock used for `registeredAt` / `lastActive`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn keystore(&self) -> &K {
        &self.keystore
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the device identity on first run, or refresh `lastActive`.
    ///
    /// Safe to call on every start: an existing identity is returned as
    /// persisted apart from the timestamp. The device id is not re-derived,
    /// so later changes to the environment do not rename the device.
    pub async fn initialize_device(&self) -> Result<DeviceInfo> {
        let now = self.clock.now_millis();

        if let Some((_, mut info)) = self.load_identity().await? {
            info.touch(now);
            self.keystore.update_device_info(&info).await?;
            tracing::debug!(device_id = %info.device_id, "device identity refreshed");
            return Ok(info);
        }

        let signals = self.environment.signals();
        let device_id = signals.device_id();
        let device_name = self
            .config
            .device_name
            .clone()
            .unwrap_or_else(|| signals.device_name());

        let key_pair = self.generate_key_pair().await?;
        let record = key_pair.to_record()?;
        let info = DeviceInfo::new(device_id, device_name, record.public_key.clone(), now);

        self.keystore.store_identity(&record, &info).await?;
        tracing::info!(
            device_id = %info.device_id,
            device_name = %info.device_name,
            "device initialized"
        );

        Ok(info)
    }

    /// The persisted identity, or `None` if the device was never initialized.
    pub async fn device_info(&self) -> Result<Option<DeviceInfo>> {
        Ok(self.load_identity().await?.map(|(_, info)| info))
    }

    pub async fn is_initialized(&self) -> Result<bool> {
        Ok(self.load_identity().await?.is_some())
    }

    /// Delete the key pair and device record.
    ///
    /// Irreversible. Content wrapped for the old public key can no longer be
    /// opened on this installation; this is how a device is revoked.
    pub async fn reset_device(&self) -> Result<()> {
        let previous = self.keystore.load_device_info().await.ok().flatten();
        self.keystore.clear().await?;

        match previous {
            Some(info) => tracing::info!(device_id = %info.device_id, "device reset"),
            None => tracing::debug!("device reset with no stored identity"),
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Import the device public key from storage.
    pub async fn public_key(&self) -> Result<DevicePublicKey> {
        let (keys, _) = self.require_identity().await?;
        Ok(DevicePublicKey::import(&keys.public_key)?)
    }

    /// Import the device private key from storage.
    pub async fn private_key(&self) -> Result<DevicePrivateKey> {
        let (keys, _) = self.require_identity().await?;
        Ok(DevicePrivateKey::import(&keys.private_key)?)
    }

    /// The exported public key, as handed to a collaborator.
    pub async fn public_key_string(&self) -> Result<String> {
        let (_, info) = self.require_identity().await?;
        Ok(info.public_key)
    }

    /// What a collaborator needs to address content to this device.
    pub async fn registration(&self) -> Result<DeviceRegistration> {
        let (_, info) = self.require_identity().await?;
        Ok(info.registration())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Recover a content key wrapped for this device.
    pub async fn unwrap_content_key(&self, record: &WrappedKeyRecord) -> Result<ContentKey> {
        let (keys, info) = self.require_identity().await?;
        if record.device_id != info.device_id {
            return Err(CryptoError::NotARecipient(info.device_id).into());
        }

        let private_key = DevicePrivateKey::import(&keys.private_key)?;
        record.open(&private_key).map_err(|e| {
            tracing::warn!(device_id = %info.device_id, "content key unwrap failed");
            ExamsealError::from(e)
        })
    }

    /// Unwrap the content key and decrypt one payload.
    pub async fn decrypt_payload(
        &self,
        payload: &EncryptedPayload,
        record: &WrappedKeyRecord,
    ) -> Result<Vec<u8>> {
        let key = self.unwrap_content_key(record).await?;
        Ok(payload.decrypt(&key)?)
    }

    /// This device's copy of an envelope's content key.
    pub async fn envelope_key(&self, envelope: &ContentEnvelope) -> Result<ContentKey> {
        let (keys, info) = self.require_identity().await?;
        let private_key = DevicePrivateKey::import(&keys.private_key)?;
        envelope
            .unwrap_content_key(&info.device_id, &private_key)
            .map_err(|e| {
                if matches!(e, CryptoError::UnwrapFailed) {
                    tracing::warn!(device_id = %info.device_id, "envelope key unwrap failed");
                }
                ExamsealError::from(e)
            })
    }

    /// Open an envelope addressed to this device.
    pub async fn open_envelope(&self, envelope: &ContentEnvelope) -> Result<Vec<u8>> {
        let key = self.envelope_key(envelope).await?;
        Ok(envelope.decrypt_with(&key)?)
    }

    /// This device's id, if initialized.
    pub async fn device_id(&self) -> Result<Option<DeviceId>> {
        Ok(self.device_info().await?.map(|info| info.device_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Load both records and check they describe the same key.
    async fn load_identity(&self) -> Result<Option<(DeviceKeyRecord, DeviceInfo)>> {
        let Some((keys, info)) = self.keystore.load_identity().await? else {
            return Ok(None);
        };

        if keys.public_key != info.public_key {
            return Err(ExamsealError::IdentityFormat(
                "device info public key does not match the stored key pair".into(),
            ));
        }
        DevicePublicKey::import(&keys.public_key)?;

        Ok(Some((keys, info)))
    }

    async fn require_identity(&self) -> Result<(DeviceKeyRecord, DeviceInfo)> {
        self.load_identity()
            .await?
            .ok_or(ExamsealError::DeviceNotInitialized)
    }

    async fn generate_key_pair(&self) -> Result<DeviceKeyPair> {
        if !self.config.offload_key_generation {
            return Ok(DeviceKeyPair::generate()?);
        }

        let generated = tokio::task::spawn_blocking(DeviceKeyPair::generate)
            .await
            .map_err(|e| CryptoError::Provider(format!("key generation task failed: {}", e)))?;
        Ok(generated?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{ErrorKind, FailureClass};
    use crate::fingerprint::StaticEnvironment;
    use examseal_core::{PersistedRecord, RecordKind};
    use examseal_crypto::ContentEnvelopeBuilder;
    use examseal_keystore::MemoryKeystore;

    fn manager(host: &str, clock: Arc<ManualClock>) -> DeviceManager<Arc<MemoryKeystore>> {
        DeviceManager::new(Arc::new(MemoryKeystore::new()), DeviceConfig::default())
            .with_environment(Arc::new(StaticEnvironment::named(host)))
            .with_clock(clock)
    }

    #[tokio::test]
    async fn test_uninitialized_device() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));

        assert!(device.device_info().await.unwrap().is_none());
        assert!(!device.is_initialized().await.unwrap());

        let err = device.public_key().await.unwrap_err();
        assert!(matches!(err, ExamsealError::DeviceNotInitialized));
        assert_eq!(err.class(), FailureClass::DeviceNotRegistered);
        assert!(matches!(
            device.private_key().await,
            Err(ExamsealError::DeviceNotInitialized)
        ));
        assert!(matches!(
            device.public_key_string().await,
            Err(ExamsealError::DeviceNotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let clock = Arc::new(ManualClock::new(1_000));
        let device = manager("h1", clock.clone());

        let first = device.initialize_device().await.unwrap();
        assert_eq!(first.registered_at, 1_000);
        assert_eq!(first.last_active, 1_000);
        assert_eq!(first.device_name, "linux (x86_64)");

        clock.advance(60_000);
        let second = device.initialize_device().await.unwrap();
        assert_eq!(second.device_id, first.device_id);
        assert_eq!(second.public_key, first.public_key);
        assert_eq!(second.registered_at, 1_000);
        assert_eq!(second.last_active, 61_000);

        assert_eq!(device.device_info().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_device_name_override() {
        let device = DeviceManager::new(
            MemoryKeystore::new(),
            DeviceConfig::default().with_device_name("Exam Hall Tablet 7"),
        )
        .with_environment(Arc::new(StaticEnvironment::named("t7")));

        let info = device.initialize_device().await.unwrap();
        assert_eq!(info.device_name, "Exam Hall Tablet 7");
    }

    #[tokio::test]
    async fn test_key_accessors_match_record() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));
        let info = device.initialize_device().await.unwrap();

        let public = device.public_key().await.unwrap();
        assert_eq!(public.export().unwrap(), info.public_key);
        assert_eq!(device.public_key_string().await.unwrap(), info.public_key);
        assert_eq!(device.private_key().await.unwrap().public_key(), public);

        let registration = device.registration().await.unwrap();
        assert_eq!(registration.device_id, info.device_id);
        assert_eq!(registration.public_key, info.public_key);
    }

    #[tokio::test]
    async fn test_unwrap_and_decrypt_payload() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));
        let info = device.initialize_device().await.unwrap();
        let public = device.public_key().await.unwrap();

        let key = ContentKey::generate().unwrap();
        let payload = key.encrypt(b"Question 1...").unwrap();
        let record = WrappedKeyRecord::create(info.device_id.clone(), &key, &public).unwrap();

        let recovered = device.unwrap_content_key(&record).await.unwrap();
        assert_eq!(recovered, key);
        assert_eq!(
            device.decrypt_payload(&payload, &record).await.unwrap(),
            b"Question 1..."
        );
    }

    #[tokio::test]
    async fn test_record_for_other_device_is_not_a_recipient() {
        let d1 = manager("h1", Arc::new(ManualClock::new(0)));
        let d2 = manager("h2", Arc::new(ManualClock::new(0)));
        let info1 = d1.initialize_device().await.unwrap();
        d2.initialize_device().await.unwrap();

        let key = ContentKey::generate().unwrap();
        let record =
            WrappedKeyRecord::create(info1.device_id, &key, &d1.public_key().await.unwrap())
                .unwrap();

        let err = d2.unwrap_content_key(&record).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotARecipient);
    }

    #[tokio::test]
    async fn test_open_envelope() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));
        let info = device.initialize_device().await.unwrap();

        let envelope = ContentEnvelopeBuilder::new(b"Section B".to_vec())
            .unwrap()
            .recipient(info.device_id, &device.public_key().await.unwrap())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(device.open_envelope(&envelope).await.unwrap(), b"Section B");
    }

    #[tokio::test]
    async fn test_reset_then_reinitialize_revokes_old_wraps() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));
        let before = device.initialize_device().await.unwrap();

        let key = ContentKey::generate().unwrap();
        let record = WrappedKeyRecord::create(
            before.device_id.clone(),
            &key,
            &device.public_key().await.unwrap(),
        )
        .unwrap();

        device.reset_device().await.unwrap();
        assert!(device.keystore().is_empty());
        assert!(matches!(
            device.private_key().await,
            Err(ExamsealError::DeviceNotInitialized)
        ));

        let after = device.initialize_device().await.unwrap();
        assert_eq!(after.device_id, before.device_id);
        assert_ne!(after.public_key, before.public_key);

        let err = device.unwrap_content_key(&record).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnwrapFailed);
        assert_eq!(err.class(), FailureClass::ContentUndecryptable);
    }

    #[tokio::test]
    async fn test_reset_when_uninitialized_is_ok() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));
        device.reset_device().await.unwrap();
    }

    #[tokio::test]
    async fn test_inconsistent_identity_is_key_format() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));
        let mut info = device.initialize_device().await.unwrap();

        let other = DeviceKeyPair::generate().unwrap();
        info.public_key = other.public_key().export().unwrap();
        let text = PersistedRecord::from(info).to_json().unwrap();
        device
            .keystore()
            .insert_raw(RecordKind::DeviceInfo, text)
            .unwrap();

        let err = device.initialize_device().await.unwrap_err();
        assert!(matches!(err, ExamsealError::IdentityFormat(_)));
        assert_eq!(err.kind(), ErrorKind::KeyFormat);
    }

    #[tokio::test]
    async fn test_half_identity_is_key_format() {
        let device = manager("h1", Arc::new(ManualClock::new(0)));
        device.initialize_device().await.unwrap();
        device
            .keystore()
            .remove_raw(RecordKind::DeviceKey)
            .unwrap();

        let err = device.public_key().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyFormat);
    }

    #[tokio::test]
    async fn test_inline_key_generation() {
        let config = DeviceConfig {
            offload_key_generation: false,
            ..DeviceConfig::default()
        };
        let device = DeviceManager::new(MemoryKeystore::new(), config)
            .with_environment(Arc::new(StaticEnvironment::named("inline")));

        let info = device.initialize_device().await.unwrap();
        assert!(info.device_id.as_str().starts_with("dev_"));
    }
}
