//! Error types for ExamSeal.

use examseal_core::{ContentId, CoreError, DeviceId};
use examseal_crypto::CryptoError;
use examseal_keystore::KeystoreError;
use thiserror::Error;

/// Errors that can occur during device and distribution operations.
#[derive(Debug, Error)]
pub enum ExamsealError {
    /// A primitive failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Local storage failed.
    #[error("keystore error: {0}")]
    Keystore(#[from] KeystoreError),

    /// An operation needing the device key pair ran before initialization.
    #[error("device is not initialized")]
    DeviceNotInitialized,

    /// The locally persisted identity is malformed or inconsistent.
    #[error("persisted device identity is corrupted: {0}")]
    IdentityFormat(String),

    /// The directory has no public key for this device.
    #[error("device {0} is not registered")]
    UnknownDevice(DeviceId),

    /// No content stored under this id.
    #[error("content not found: {0}")]
    ContentNotFound(ContentId),

    /// None of the requested devices could be addressed.
    #[error("no registered recipients for content {0}")]
    NoRecipients(ContentId),

    /// A collaborator (directory, repository) failed.
    #[error("collaborator error: {0}")]
    Collaborator(#[source] anyhow::Error),
}

impl From<CoreError> for ExamsealError {
    fn from(e: CoreError) -> Self {
        ExamsealError::Crypto(CryptoError::from(e))
    }
}

/// The failure taxonomy, independent of which layer raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CryptoProvider,
    AuthenticationFailed,
    KeyFormat,
    UnwrapFailed,
    DeviceNotInitialized,
    NotARecipient,
    UnknownDevice,
    ContentNotFound,
    Storage,
    Collaborator,
}

/// What a user-facing surface should suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// This device has no usable identity: initialize or re-register it.
    DeviceNotRegistered,
    /// This device cannot read the content: request re-distribution.
    ContentUndecryptable,
    /// The runtime's crypto provider is unusable.
    Configuration,
    /// Local storage or a collaborator failed; may succeed later.
    Storage,
}

impl ExamsealError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExamsealError::Crypto(e) => match e {
                CryptoError::Provider(_) => ErrorKind::CryptoProvider,
                CryptoError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
                CryptoError::KeyFormat(_) => ErrorKind::KeyFormat,
                CryptoError::UnwrapFailed => ErrorKind::UnwrapFailed,
                CryptoError::NotARecipient(_) => ErrorKind::NotARecipient,
            },
            ExamsealError::Keystore(KeystoreError::Record(_))
            | ExamsealError::Keystore(KeystoreError::Incomplete { .. })
            | ExamsealError::IdentityFormat(_) => ErrorKind::KeyFormat,
            ExamsealError::Keystore(_) => ErrorKind::Storage,
            ExamsealError::DeviceNotInitialized => ErrorKind::DeviceNotInitialized,
            ExamsealError::UnknownDevice(_) | ExamsealError::NoRecipients(_) => {
                ErrorKind::UnknownDevice
            }
            ExamsealError::ContentNotFound(_) => ErrorKind::ContentNotFound,
            ExamsealError::Collaborator(_) => ErrorKind::Collaborator,
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            ExamsealError::DeviceNotInitialized
            | ExamsealError::IdentityFormat(_)
            | ExamsealError::UnknownDevice(_)
            | ExamsealError::NoRecipients(_)
            | ExamsealError::Keystore(KeystoreError::Record(_))
            | ExamsealError::Keystore(KeystoreError::Incomplete { .. }) => {
                FailureClass::DeviceNotRegistered
            }
            ExamsealError::Crypto(CryptoError::Provider(_)) => FailureClass::Configuration,
            ExamsealError::Crypto(_) | ExamsealError::ContentNotFound(_) => {
                FailureClass::ContentUndecryptable
            }
            ExamsealError::Keystore(_) | ExamsealError::Collaborator(_) => FailureClass::Storage,
        }
    }
}

/// Result type for ExamSeal operations.
pub type Result<T> = std::result::Result<T, ExamsealError>;
