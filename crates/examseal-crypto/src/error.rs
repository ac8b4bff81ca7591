//! Error types for the cryptographic primitives.

use examseal_core::{CoreError, DeviceId};
use thiserror::Error;

/// Errors raised by the primitives.
///
/// None of these are retried. Messages never include key, plaintext or
/// ciphertext bytes.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The crypto provider rejected the operation (unsupported parameters,
    /// RNG failure, encoder failure). A configuration problem, not bad input.
    #[error("crypto provider error: {0}")]
    Provider(String),

    /// Authenticated decryption failed: tampered ciphertext, wrong key or
    /// wrong IV.
    #[error("authentication failed: content is corrupted or was tampered with")]
    AuthenticationFailed,

    /// Malformed text encoding or key structure on import.
    #[error("key format error: {0}")]
    KeyFormat(String),

    /// The private key does not open this wrapped key.
    #[error("unwrap failed: wrapped key was not issued for this private key")]
    UnwrapFailed,

    /// The envelope carries no wrapped key for this device.
    #[error("no wrapped key addressed to device {0}")]
    NotARecipient(DeviceId),
}

impl From<CoreError> for CryptoError {
    fn from(e: CoreError) -> Self {
        CryptoError::KeyFormat(e.to_string())
    }
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
