//! Persisted device records.
//!
//! A device keeps two logical records in local storage: its key pair and its
//! public identity. Both are stored as JSON inside a [`PersistedRecord`],
//! which is tagged by `kind` and carries an explicit `version` so that a
//! record of the wrong shape or from an unknown format revision is rejected
//! at decode time.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};
use crate::types::DeviceId;

/// Current version of every persisted record body.
pub const RECORD_VERSION: u16 = 1;

/// Discriminator for persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    DeviceKey,
    DeviceInfo,
}

impl RecordKind {
    /// The `kind` tag written into the JSON body.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordKind::DeviceKey => "device_key",
            RecordKind::DeviceInfo => "device_info",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The device key pair in transport-safe text form.
///
/// `public_key` is base64 SPKI DER and `private_key` base64 PKCS#8 DER.
/// Parsing the key material is the crypto layer's job; this record only
/// guarantees the fields are present. The private key text is wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct DeviceKeyRecord {
    #[zeroize(skip)]
    pub version: u16,
    #[zeroize(skip)]
    pub public_key: String,
    pub private_key: String,
}

impl DeviceKeyRecord {
    pub fn new(public_key: String, private_key: String) -> Self {
        Self {
            version: RECORD_VERSION,
            public_key,
            private_key,
        }
    }
}

impl fmt::Debug for DeviceKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceKeyRecord")
            .field("version", &self.version)
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// A device's public identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub version: u16,
    pub device_id: DeviceId,
    /// Human-readable platform label.
    pub device_name: String,
    /// Base64 SPKI DER public key, identical to the key record's.
    pub public_key: String,
    /// Unix milliseconds.
    pub registered_at: i64,
    /// Unix milliseconds, refreshed on every initialization.
    pub last_active: i64,
}

impl DeviceInfo {
    /// Create a freshly registered record; `last_active` starts at `now`.
    pub fn new(device_id: DeviceId, device_name: String, public_key: String, now: i64) -> Self {
        Self {
            version: RECORD_VERSION,
            device_id,
            device_name,
            public_key,
            registered_at: now,
            last_active: now,
        }
    }

    /// Refresh `last_active`. Timestamps never move backwards.
    pub fn touch(&mut self, now: i64) {
        self.last_active = self.last_active.max(now);
    }

    /// The subset a collaborator needs to register this device.
    pub fn registration(&self) -> DeviceRegistration {
        DeviceRegistration {
            device_id: self.device_id.clone(),
            device_name: self.device_name.clone(),
            public_key: self.public_key.clone(),
        }
    }
}

/// What a collaborator stores against a device id to address content to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub device_id: DeviceId,
    pub device_name: String,
    pub public_key: String,
}

/// Tagged container for everything a device persists locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistedRecord {
    DeviceKey(DeviceKeyRecord),
    DeviceInfo(DeviceInfo),
}

impl PersistedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            PersistedRecord::DeviceKey(_) => RecordKind::DeviceKey,
            PersistedRecord::DeviceInfo(_) => RecordKind::DeviceInfo,
        }
    }

    fn version(&self) -> u16 {
        match self {
            PersistedRecord::DeviceKey(r) => r.version,
            PersistedRecord::DeviceInfo(r) => r.version,
        }
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::MalformedRecord(e.to_string()))
    }

    /// Parse and validate JSON text.
    ///
    /// Fails on unknown kinds, missing fields and unsupported versions.
    pub fn from_json(text: &str) -> Result<Self> {
        let record: PersistedRecord = serde_json::from_str(text)
            .map_err(|e| CoreError::MalformedRecord(redact_serde_error(&e)))?;

        if record.version() != RECORD_VERSION {
            return Err(CoreError::UnsupportedVersion {
                kind: record.kind(),
                version: record.version(),
            });
        }

        Ok(record)
    }

    /// Unwrap as a key record, failing if this is another kind.
    pub fn into_device_key(self) -> Result<DeviceKeyRecord> {
        match self {
            PersistedRecord::DeviceKey(r) => Ok(r),
            other => Err(CoreError::UnexpectedKind {
                expected: RecordKind::DeviceKey,
                found: other.kind(),
            }),
        }
    }

    /// Unwrap as an info record, failing if this is another kind.
    pub fn into_device_info(self) -> Result<DeviceInfo> {
        match self {
            PersistedRecord::DeviceInfo(r) => Ok(r),
            other => Err(CoreError::UnexpectedKind {
                expected: RecordKind::DeviceInfo,
                found: other.kind(),
            }),
        }
    }
}

impl From<DeviceKeyRecord> for PersistedRecord {
    fn from(r: DeviceKeyRecord) -> Self {
        PersistedRecord::DeviceKey(r)
    }
}

impl From<DeviceInfo> for PersistedRecord {
    fn from(r: DeviceInfo) -> Self {
        PersistedRecord::DeviceInfo(r)
    }
}

// serde_json can quote input fragments in its messages; keep only the
// category and position.
fn redact_serde_error(e: &serde_json::Error) -> String {
    format!("{:?} error at line {} column {}", e.classify(), e.line(), e.column())
}
