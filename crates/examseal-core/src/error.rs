//! Error types for the ExamSeal core.

use thiserror::Error;

use crate::record::RecordKind;

/// Errors raised while decoding text-encoded material or persisted records.
///
/// Messages describe the shape of the problem only; they never echo the
/// offending input, which may be key material.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    #[error("unsupported {kind} record version: {version}")]
    UnsupportedVersion { kind: RecordKind, version: u16 },

    #[error("expected a {expected} record, found {found}")]
    UnexpectedKind {
        expected: RecordKind,
        found: RecordKind,
    },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
