//! Device key pairs.
//!
//! Each device holds one RSA-2048 key pair used only for encryption: content
//! keys are wrapped under the public half with RSA-OAEP (SHA-256). Keys are
//! exported as base64 DER (SPKI for public, PKCS#8 for private).

use examseal_core::{decode_base64, encode_base64, DeviceKeyRecord};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};

/// Modulus size of every device key.
pub const DEVICE_KEY_BITS: usize = 2048;

/// The public half of a device key pair. Safe to share.
#[derive(Clone, PartialEq, Eq)]
pub struct DevicePublicKey(RsaPublicKey);

impl DevicePublicKey {
    /// Export as base64 SPKI DER.
    pub fn export(&self) -> Result<String> {
        let der = self
            .0
            .to_public_key_der()
            .map_err(|e| CryptoError::Provider(format!("public key encoding failed: {}", e)))?;
        Ok(encode_base64(der.as_bytes()))
    }

    /// Import from base64 SPKI DER.
    pub fn import(text: &str) -> Result<Self> {
        let der = decode_base64(text)?;
        let key = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| CryptoError::KeyFormat(format!("invalid public key: {}", e)))?;
        check_modulus(key.size())?;
        Ok(Self(key))
    }

    pub(crate) fn inner(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl fmt::Debug for DevicePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePublicKey(rsa-{})", self.0.size() * 8)
    }
}

/// The private half of a device key pair.
///
/// Owned by the device manager; callers should prefer unwrapping through it
/// rather than holding one of these.
#[derive(Clone)]
pub struct DevicePrivateKey(RsaPrivateKey);

impl DevicePrivateKey {
    /// Export as base64 PKCS#8 DER.
    pub fn export(&self) -> Result<String> {
        let der = self
            .0
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Provider(format!("private key encoding failed: {}", e)))?;
        Ok(encode_base64(der.as_bytes()))
    }

    /// Import from base64 PKCS#8 DER.
    pub fn import(text: &str) -> Result<Self> {
        let mut der = decode_base64(text)?;
        let parsed = RsaPrivateKey::from_pkcs8_der(&der);
        der.zeroize();

        let key = parsed.map_err(|e| CryptoError::KeyFormat(format!("invalid private key: {}", e)))?;
        key.validate()
            .map_err(|e| CryptoError::KeyFormat(format!("inconsistent private key: {}", e)))?;
        check_modulus(key.size())?;
        Ok(Self(key))
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> DevicePublicKey {
        DevicePublicKey(self.0.to_public_key())
    }

    pub(crate) fn inner(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl fmt::Debug for DevicePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DevicePrivateKey(<redacted>)")
    }
}

/// An RSA-2048 encryption key pair bound to one device installation.
#[derive(Debug, Clone)]
pub struct DeviceKeyPair {
    public: DevicePublicKey,
    private: DevicePrivateKey,
}

impl DeviceKeyPair {
    /// Generate a new key pair.
    ///
    /// CPU-heavy (tens to hundreds of milliseconds); async callers should run
    /// it off the executor.
    pub fn generate() -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, DEVICE_KEY_BITS)
            .map_err(|e| CryptoError::Provider(format!("key generation failed: {}", e)))?;
        let public = private.to_public_key();
        Ok(Self {
            public: DevicePublicKey(public),
            private: DevicePrivateKey(private),
        })
    }

    pub fn public_key(&self) -> &DevicePublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &DevicePrivateKey {
        &self.private
    }

    /// Export both halves into a persistable record.
    pub fn to_record(&self) -> Result<DeviceKeyRecord> {
        Ok(DeviceKeyRecord::new(
            self.public.export()?,
            self.private.export()?,
        ))
    }

    /// Rebuild from a persisted record, checking both halves belong together.
    pub fn from_record(record: &DeviceKeyRecord) -> Result<Self> {
        let public = DevicePublicKey::import(&record.public_key)?;
        let private = DevicePrivateKey::import(&record.private_key)?;
        if private.public_key() != public {
            return Err(CryptoError::KeyFormat(
                "public and private key do not form a pair".into(),
            ));
        }
        Ok(Self { public, private })
    }
}

fn check_modulus(size_bytes: usize) -> Result<()> {
    if size_bytes * 8 != DEVICE_KEY_BITS {
        return Err(CryptoError::KeyFormat(format!(
            "expected a {}-bit key, got {} bits",
            DEVICE_KEY_BITS,
            size_bytes * 8
        )));
    }
    Ok(())
}
