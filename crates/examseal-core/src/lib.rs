//! # ExamSeal Core
//!
//! Pure data model for the ExamSeal content-encryption core: identifiers,
//! persisted device records, and the text encodings used wherever bytes
//! cross a text-only boundary.
//!
//! This crate contains no I/O and no cryptography. It is plain data plus
//! strict parsing, so that malformed or legacy-shaped records fail here
//! instead of somewhere downstream.
//!
//! ## Key Types
//!
//! - [`DeviceId`] - Stable, non-secret device fingerprint used as a lookup key
//! - [`ContentId`] - Opaque identifier a collaborator stores content under
//! - [`DeviceInfo`] - A device's public identity record
//! - [`DeviceKeyRecord`] - The persisted, text-encoded device key pair
//! - [`PersistedRecord`] - Tagged, versioned container for both records
//!
//! ## Encoding
//!
//! All binary material is carried as standard base64. See [`encoding`].

pub mod encoding;
pub mod error;
pub mod record;
pub mod types;

pub use encoding::{decode_base64, encode_base64};
pub use error::{CoreError, Result};
pub use record::{
    DeviceInfo, DeviceKeyRecord, DeviceRegistration, PersistedRecord, RecordKind,
    RECORD_VERSION,
};
pub use types::{ContentId, DeviceId};
