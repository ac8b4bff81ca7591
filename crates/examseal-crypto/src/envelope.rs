//! Multi-recipient content envelope.
//!
//! One piece of content is encrypted once, and its content key is wrapped
//! separately for every recipient device:
//!
//! ```text
//! { "version": 1, "format": "A256GCM", "iv": "...", "ciphertext": "...",
//!   "wrappedKeys": { "<deviceId>": "<wrapped key, base64>" } }
//! ```
//!
//! The envelope travels as JSON across text boundaries or as CBOR where bytes
//! are fine.

use std::collections::BTreeMap;

use examseal_core::encoding::base64_bytes;
use examseal_core::DeviceId;
use serde::{Deserialize, Serialize};

use crate::content::{ContentKey, EncryptedPayload, EncryptionFormat, Iv};
use crate::device_key::{DevicePrivateKey, DevicePublicKey};
use crate::error::{CryptoError, Result};
use crate::wrap::{WrappedKey, WrappedKeyRecord};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u16 = 1;

/// Encrypted content plus one wrapped content key per recipient device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEnvelope {
    pub version: u16,
    pub format: EncryptionFormat,
    pub iv: Iv,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    pub wrapped_keys: BTreeMap<DeviceId, WrappedKey>,
}

impl ContentEnvelope {
    /// Assemble an envelope from its parts.
    pub fn from_parts(payload: EncryptedPayload, records: Vec<WrappedKeyRecord>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            format: payload.format,
            iv: payload.iv,
            ciphertext: payload.ciphertext,
            wrapped_keys: records
                .into_iter()
                .map(|r| (r.device_id, r.wrapped_key))
                .collect(),
        }
    }

    /// The shared encrypted payload.
    pub fn payload(&self) -> EncryptedPayload {
        EncryptedPayload {
            format: self.format,
            iv: self.iv,
            ciphertext: self.ciphertext.clone(),
        }
    }

    /// The wrapped key addressed to `device_id`, if any.
    pub fn wrapped_key_for(&self, device_id: &DeviceId) -> Option<WrappedKeyRecord> {
        self.wrapped_keys
            .get(device_id)
            .map(|wrapped_key| WrappedKeyRecord {
                device_id: device_id.clone(),
                wrapped_key: wrapped_key.clone(),
            })
    }

    /// Split into one record per recipient.
    pub fn wrapped_key_records(&self) -> Vec<WrappedKeyRecord> {
        self.wrapped_keys
            .iter()
            .map(|(device_id, wrapped_key)| WrappedKeyRecord {
                device_id: device_id.clone(),
                wrapped_key: wrapped_key.clone(),
            })
            .collect()
    }

    /// Recipients in device-id order.
    pub fn recipients(&self) -> impl Iterator<Item = &DeviceId> {
        self.wrapped_keys.keys()
    }

    pub fn is_recipient(&self, device_id: &DeviceId) -> bool {
        self.wrapped_keys.contains_key(device_id)
    }

    /// Address an existing envelope to one more device.
    ///
    /// Needs the content key, so only whoever sealed the content (or a
    /// current recipient that unwrapped it) can extend the recipient set.
    /// Replaces any previous wrapped key for the same device.
    pub fn add_recipient(
        &mut self,
        content_key: &ContentKey,
        device_id: DeviceId,
        public_key: &DevicePublicKey,
    ) -> Result<()> {
        let record = WrappedKeyRecord::create(device_id, content_key, public_key)?;
        self.wrapped_keys.insert(record.device_id, record.wrapped_key);
        Ok(())
    }

    /// Drop a device's wrapped key. Returns whether it was present.
    pub fn remove_recipient(&mut self, device_id: &DeviceId) -> bool {
        self.wrapped_keys.remove(device_id).is_some()
    }

    /// Unwrap this device's copy of the content key.
    pub fn unwrap_content_key(
        &self,
        device_id: &DeviceId,
        private_key: &DevicePrivateKey,
    ) -> Result<ContentKey> {
        let wrapped = self
            .wrapped_keys
            .get(device_id)
            .ok_or_else(|| CryptoError::NotARecipient(device_id.clone()))?;
        private_key.unwrap_key(wrapped)
    }

    /// Unwrap this device's key and decrypt the content.
    pub fn open(&self, device_id: &DeviceId, private_key: &DevicePrivateKey) -> Result<Vec<u8>> {
        let key = self.unwrap_content_key(device_id, private_key)?;
        self.decrypt_with(&key)
    }

    /// Decrypt with an already unwrapped content key.
    pub fn decrypt_with(&self, key: &ContentKey) -> Result<Vec<u8>> {
        match self.format {
            EncryptionFormat::Aes256Gcm => key.decrypt(&self.ciphertext, &self.iv),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CryptoError::Provider(e.to_string()))
    }

    /// Parse from JSON, checking the format version.
    pub fn from_json(text: &str) -> Result<Self> {
        let envelope: Self = serde_json::from_str(text).map_err(|e| {
            CryptoError::KeyFormat(format!("malformed envelope: {:?}", e.classify()))
        })?;
        envelope.check_version()?;
        Ok(envelope)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CryptoError::Provider(format!("CBOR serialization failed: {}", e)))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes, checking the format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Self = ciborium::from_reader(bytes)
            .map_err(|_| CryptoError::KeyFormat("malformed envelope bytes".into()))?;
        envelope.check_version()?;
        Ok(envelope)
    }

    fn check_version(&self) -> Result<()> {
        if self.version != ENVELOPE_VERSION {
            return Err(CryptoError::KeyFormat(format!(
                "unsupported envelope version: {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// Builder for an envelope with multiple recipients.
pub struct ContentEnvelopeBuilder {
    plaintext: Vec<u8>,
    content_key: ContentKey,
    records: Vec<WrappedKeyRecord>,
}

impl ContentEnvelopeBuilder {
    /// Start building; generates the content key.
    pub fn new(plaintext: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self {
            plaintext: plaintext.into(),
            content_key: ContentKey::generate()?,
            records: Vec::new(),
        })
    }

    /// Wrap the content key for one device.
    pub fn recipient(mut self, device_id: DeviceId, public_key: &DevicePublicKey) -> Result<Self> {
        self.records.retain(|r| r.device_id != device_id);
        self.records.push(WrappedKeyRecord::create(
            device_id,
            &self.content_key,
            public_key,
        )?);
        Ok(self)
    }

    /// The content key, for re-wrapping to devices registered later.
    pub fn content_key(&self) -> &ContentKey {
        &self.content_key
    }

    /// Encrypt the content and assemble the envelope.
    pub fn build(self) -> Result<ContentEnvelope> {
        let payload = self.content_key.encrypt(&self.plaintext)?;
        Ok(ContentEnvelope::from_parts(payload, self.records))
    }
}
