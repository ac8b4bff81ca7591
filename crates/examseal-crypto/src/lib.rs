//! # ExamSeal Crypto
//!
//! Stateless cryptographic primitives for distributing content to
//! individually registered devices.
//!
//! ## Encryption Model
//!
//! Content uses a two-layer key model:
//!
//! 1. **Content key**: a fresh AES-256-GCM key per content item. The IV is
//!    generated inside every encryption call.
//! 2. **Wrapped keys**: the content key is encrypted under each recipient
//!    device's RSA-2048 public key (RSA-OAEP, SHA-256).
//!
//! N devices recover the one shared content key independently, and the
//! content key never exists in transmittable plaintext form.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use examseal_crypto::{ContentEnvelopeBuilder, DeviceKeyPair};
//! use examseal_core::DeviceId;
//!
//! # fn main() -> examseal_crypto::Result<()> {
//! let device = DeviceKeyPair::generate()?;
//! let device_id = DeviceId::new("dev_1").unwrap();
//!
//! let envelope = ContentEnvelopeBuilder::new(b"Question 1...".to_vec())?
//!     .recipient(device_id.clone(), device.public_key())?
//!     .build()?;
//!
//! let plaintext = envelope.open(&device_id, device.private_key())?;
//! assert_eq!(plaintext, b"Question 1...");
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod device_key;
pub mod envelope;
pub mod error;
pub mod wrap;

pub use content::{
    ContentKey, EncryptedPayload, EncryptionFormat, Iv, CONTENT_KEY_LEN, IV_LEN, TAG_LEN,
};
pub use device_key::{DeviceKeyPair, DevicePrivateKey, DevicePublicKey, DEVICE_KEY_BITS};
pub use envelope::{ContentEnvelope, ContentEnvelopeBuilder, ENVELOPE_VERSION};
pub use error::{CryptoError, Result};
pub use wrap::{WrappedKey, WrappedKeyRecord, OAEP_MAX_PAYLOAD};
