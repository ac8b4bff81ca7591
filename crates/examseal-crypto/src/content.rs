//! Symmetric content encryption.
//!
//! Content is sealed once under a fresh 256-bit [`ContentKey`] with
//! AES-256-GCM. The IV is drawn inside [`ContentKey::encrypt`]; callers cannot
//! supply one, so an IV is never reused with the same key by construction.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use examseal_core::encoding::{base64_array, base64_bytes};
use examseal_core::{decode_base64, encode_base64};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

/// Content key length in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

/// IV length in bytes.
pub const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes, appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// A 256-bit AES-GCM content encryption key (CEK).
///
/// Wiped from memory on drop. Leaves this process only wrapped under a
/// device public key. Equality runs in constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_LEN]);

impl ContentKey {
    /// Generate a fresh key from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }

    /// Export as base64 of the raw key bytes.
    pub fn export(&self) -> String {
        encode_base64(self.0)
    }

    /// Import from [`ContentKey::export`] output.
    pub fn import(text: &str) -> Result<Self> {
        let mut bytes = decode_base64(text)?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; CONTENT_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::KeyFormat(format!(
                "content key must be {} bytes, got {}",
                CONTENT_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|e| CryptoError::Provider(e.to_string()))
    }

    /// Encrypt `plaintext` under this key with a freshly generated IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedPayload> {
        let iv = Iv::generate()?;
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(iv.as_bytes()), plaintext)
            .map_err(|_| CryptoError::Provider("AES-256-GCM encryption rejected".into()))?;

        Ok(EncryptedPayload {
            format: EncryptionFormat::Aes256Gcm,
            iv,
            ciphertext,
        })
    }

    /// Decrypt and authenticate `ciphertext` (tag appended) under this key.
    ///
    /// Any mismatch of key, IV or ciphertext is [`CryptoError::AuthenticationFailed`].
    pub fn decrypt(&self, ciphertext: &[u8], iv: &Iv) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::AuthenticationFailed);
        }
        self.cipher()?
            .decrypt(Nonce::from_slice(iv.as_bytes()), ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for ContentKey {}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// A 96-bit AES-GCM initialization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Iv(#[serde(with = "base64_array")] [u8; IV_LEN]);

impl Iv {
    /// Generate a random IV.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; IV_LEN];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; IV_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::KeyFormat(format!("iv must be {} bytes, got {}", IV_LEN, bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Parse from base64.
    pub fn from_base64(text: &str) -> Result<Self> {
        Self::from_slice(&decode_base64(text)?)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }

    /// Encode as standard padded base64.
    pub fn to_base64(&self) -> String {
        encode_base64(self.0)
    }
}

/// Format identifier for encrypted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionFormat {
    /// AES-256-GCM, 96-bit IV, 128-bit tag appended to the ciphertext.
    #[serde(rename = "A256GCM")]
    Aes256Gcm,
}

/// Result of content encryption: `{ciphertext, iv}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub format: EncryptionFormat,
    pub iv: Iv,
    /// Ciphertext with the authentication tag appended.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Decrypt with the given key.
    pub fn decrypt(&self, key: &ContentKey) -> Result<Vec<u8>> {
        match self.format {
            EncryptionFormat::Aes256Gcm => key.decrypt(&self.ciphertext, &self.iv),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CryptoError::Provider(e.to_string()))
    }

    /// Parse from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            CryptoError::KeyFormat(format!("malformed encrypted payload: {:?}", e.classify()))
        })
    }

    /// Size of the ciphertext including the tag.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::Provider(format!("random source failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_encrypt_decrypt() {
        let key = ContentKey::generate().unwrap();
        let plaintext = b"Question 1: state Newton's second law.";

        let payload = key.encrypt(plaintext).unwrap();
        assert_ne!(payload.ciphertext, plaintext);
        assert_eq!(payload.ciphertext_len(), plaintext.len() + TAG_LEN);

        let decrypted = key.decrypt(&payload.ciphertext, &payload.iv).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = ContentKey::generate().unwrap();
        let payload = key.encrypt(b"").unwrap();
        assert_eq!(payload.ciphertext_len(), TAG_LEN);
        assert!(payload.decrypt(&key).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = ContentKey::generate().unwrap();
        let key2 = ContentKey::generate().unwrap();

        let payload = key1.encrypt(b"secret").unwrap();

        assert!(matches!(
            payload.decrypt(&key2),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_wrong_iv_fails() {
        let key = ContentKey::generate().unwrap();
        let payload = key.encrypt(b"secret").unwrap();
        let other_iv = Iv::generate().unwrap();

        assert!(matches!(
            key.decrypt(&payload.ciphertext, &other_iv),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = ContentKey::generate().unwrap();
        let iv = Iv::generate().unwrap();
        assert!(matches!(
            key.decrypt(&[0u8; 5], &iv),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_every_ciphertext_bit_flip_detected() {
        let key = ContentKey::generate().unwrap();
        let payload = key.encrypt(b"exam answers").unwrap();

        for byte in 0..payload.ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = payload.ciphertext.clone();
                tampered[byte] ^= 1 << bit;
                assert!(matches!(
                    key.decrypt(&tampered, &payload.iv),
                    Err(CryptoError::AuthenticationFailed)
                ));
            }
        }
    }

    #[test]
    fn test_every_iv_bit_flip_detected() {
        let key = ContentKey::generate().unwrap();
        let payload = key.encrypt(b"exam answers").unwrap();

        for byte in 0..IV_LEN {
            for bit in 0..8 {
                let mut iv = *payload.iv.as_bytes();
                iv[byte] ^= 1 << bit;
                assert!(matches!(
                    key.decrypt(&payload.ciphertext, &Iv::from_bytes(iv)),
                    Err(CryptoError::AuthenticationFailed)
                ));
            }
        }
    }

    #[test]
    fn test_iv_unique_across_10k_encryptions() {
        let key = ContentKey::generate().unwrap();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let payload = key.encrypt(b"same plaintext").unwrap();
            assert!(seen.insert(payload.iv), "iv collision");
        }
    }

    #[test]
    fn test_key_export_import() {
        let key = ContentKey::generate().unwrap();
        let exported = key.export();
        let imported = ContentKey::import(&exported).unwrap();
        assert_eq!(imported, key);

        // Imported key decrypts what the original encrypted, and vice versa.
        let payload = key.encrypt(b"payload").unwrap();
        assert_eq!(payload.decrypt(&imported).unwrap(), b"payload");
        let payload = imported.encrypt(b"payload").unwrap();
        assert_eq!(payload.decrypt(&key).unwrap(), b"payload");
    }

    #[test]
    fn test_key_import_rejects_wrong_length() {
        assert!(matches!(
            ContentKey::import("AQID"),
            Err(CryptoError::KeyFormat(_))
        ));
        assert!(matches!(
            ContentKey::import("%%%"),
            Err(CryptoError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_key_equality() {
        let key = ContentKey::from_bytes([0x41; 32]);
        assert_eq!(key, ContentKey::from_bytes([0x41; 32]));

        let mut last = [0x41; 32];
        last[31] ^= 0x01;
        assert_ne!(key, ContentKey::from_bytes(last));

        let mut first = [0x41; 32];
        first[0] ^= 0x80;
        assert_ne!(key, ContentKey::from_bytes(first));
    }

    #[test]
    fn test_key_debug_redacted() {
        let key = ContentKey::from_bytes([0x41; 32]);
        assert_eq!(format!("{:?}", key), "ContentKey(<redacted>)");
    }

    #[test]
    fn test_payload_json() {
        let key = ContentKey::generate().unwrap();
        let payload = key.encrypt(b"hello").unwrap();

        let json = payload.to_json().unwrap();
        assert!(json.contains(r#""format":"A256GCM""#));
        assert!(json.contains(&format!(r#""iv":"{}""#, payload.iv.to_base64())));

        let back = EncryptedPayload::from_json(&json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.decrypt(&key).unwrap(), b"hello");
    }

    #[test]
    fn test_iv_base64() {
        let iv = Iv::generate().unwrap();
        let text = iv.to_base64();
        assert_eq!(text.len(), 16);
        assert_eq!(Iv::from_base64(&text).unwrap(), iv);

        // Decodes fine but is a 16-byte value
        assert!(matches!(
            Iv::from_base64("AAAAAAAAAAAAAAAAAAAAAA=="),
            Err(CryptoError::KeyFormat(_))
        ));
        assert!(Iv::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_iv_from_slice_checks_length() {
        assert!(Iv::from_slice(&[0u8; 12]).is_ok());
        assert!(matches!(
            Iv::from_slice(&[0u8; 16]),
            Err(CryptoError::KeyFormat(_))
        ));
    }
}
