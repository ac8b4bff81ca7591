//! Content key wrapping.
//!
//! A content key is wrapped once per recipient device by encrypting its raw
//! bytes under the device public key with RSA-OAEP (SHA-256). Only the
//! matching private key can recover it. Wrapping for one device shares no
//! state with wrapping for another.

use examseal_core::encoding::base64_bytes;
use examseal_core::{decode_base64, encode_base64, DeviceId};
use rand::rngs::OsRng;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::content::{ContentKey, CONTENT_KEY_LEN};
use crate::device_key::{DevicePrivateKey, DevicePublicKey, DEVICE_KEY_BITS};
use crate::error::{CryptoError, Result};

/// Largest message RSA-OAEP/SHA-256 can carry under a device key.
pub const OAEP_MAX_PAYLOAD: usize = DEVICE_KEY_BITS / 8 - 2 * 32 - 2;

const _: () = assert!(CONTENT_KEY_LEN <= OAEP_MAX_PAYLOAD);

/// A content key encrypted under one device's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedKey(#[serde(with = "base64_bytes")] Vec<u8>);

impl WrappedKey {
    /// Wrap raw RSA-OAEP ciphertext. Not checked until unwrapped.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw ciphertext.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode as standard padded base64, the form stored in envelopes.
    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }

    /// Parse from base64. Only the encoding is checked here; a ciphertext
    /// of the wrong length fails at unwrap time.
    pub fn from_base64(text: &str) -> Result<Self> {
        Ok(Self(decode_base64(text)?))
    }
}

impl DevicePublicKey {
    /// Wrap `key` so only the holder of the matching private key can recover it.
    pub fn wrap_key(&self, key: &ContentKey) -> Result<WrappedKey> {
        let wrapped = self
            .inner()
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
            .map_err(|e| CryptoError::Provider(format!("key wrapping failed: {}", e)))?;
        Ok(WrappedKey(wrapped))
    }
}

impl DevicePrivateKey {
    /// Recover a content key wrapped under this key's public half.
    ///
    /// Fails with [`CryptoError::UnwrapFailed`] if the key was wrapped for
    /// another device or the wrapped bytes are damaged.
    pub fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<ContentKey> {
        let mut raw = self
            .inner()
            .decrypt(Oaep::new::<Sha256>(), wrapped.as_bytes())
            .map_err(|_| CryptoError::UnwrapFailed)?;

        let key = ContentKey::from_slice(&raw).map_err(|_| CryptoError::UnwrapFailed);
        raw.zeroize();
        key
    }
}

/// A wrapped content key addressed to one device.
///
/// Many records, one per authorized device, refer to the same encrypted
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyRecord {
    pub device_id: DeviceId,
    pub wrapped_key: WrappedKey,
}

impl WrappedKeyRecord {
    /// Wrap `key` for `device_id`.
    pub fn create(
        device_id: DeviceId,
        key: &ContentKey,
        recipient_public: &DevicePublicKey,
    ) -> Result<Self> {
        Ok(Self {
            device_id,
            wrapped_key: recipient_public.wrap_key(key)?,
        })
    }

    /// Recover the content key with the recipient's private key.
    pub fn open(&self, recipient_private: &DevicePrivateKey) -> Result<ContentKey> {
        recipient_private.unwrap_key(&self.wrapped_key)
    }
}
