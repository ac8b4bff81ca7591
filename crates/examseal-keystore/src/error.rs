//! Error types for the keystore.

use examseal_core::{CoreError, RecordKind};
use thiserror::Error;

/// Errors that can occur during keystore operations.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A persisted record failed to decode.
    #[error("corrupted record: {0}")]
    Record(#[from] CoreError),

    /// Only one of the two identity records is present.
    #[error("incomplete device identity: {missing} record is missing")]
    Incomplete { missing: RecordKind },

    /// A record that must already exist does not.
    #[error("{0} record not found")]
    NotFound(RecordKind),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("keystore lock poisoned")]
    Poisoned,

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Result type for keystore operations.
pub type Result<T> = std::result::Result<T, KeystoreError>;
