//! In-memory implementation of the Keystore trait.
//!
//! Primarily for tests. Records are kept as the same JSON text the SQLite
//! backend writes, so decoding is exercised identically. Nothing survives
//! the store being dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use examseal_core::{DeviceInfo, DeviceKeyRecord, PersistedRecord, RecordKind};

use crate::error::{KeystoreError, Result};
use crate::traits::Keystore;

/// In-memory keystore. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryKeystore {
    records: RwLock<HashMap<RecordKind, String>>,
}

impl MemoryKeystore {
    /// Create a new empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a slot with raw text, bypassing encoding.
    ///
    /// Lets tests plant corrupted or legacy-shaped records.
    pub fn insert_raw(&self, kind: RecordKind, text: impl Into<String>) -> Result<()> {
        let mut records = self.records.write().map_err(|_| KeystoreError::Poisoned)?;
        records.insert(kind, text.into());
        Ok(())
    }

    /// Remove a single slot, leaving the other in place.
    pub fn remove_raw(&self, kind: RecordKind) -> Result<Option<String>> {
        let mut records = self.records.write().map_err(|_| KeystoreError::Poisoned)?;
        Ok(records.remove(&kind))
    }

    /// Raw text of a slot.
    pub fn raw(&self, kind: RecordKind) -> Result<Option<String>> {
        let records = self.records.read().map_err(|_| KeystoreError::Poisoned)?;
        Ok(records.get(&kind).cloned())
    }

    /// Whether both slots are empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().map(|r| r.is_empty()).unwrap_or(false)
    }

    fn load(&self, kind: RecordKind) -> Result<Option<PersistedRecord>> {
        let records = self.records.read().map_err(|_| KeystoreError::Poisoned)?;
        records
            .get(&kind)
            .map(|text| PersistedRecord::from_json(text))
            .transpose()
            .map_err(KeystoreError::from)
    }
}

#[async_trait]
impl Keystore for MemoryKeystore {
    async fn load_key_record(&self) -> Result<Option<DeviceKeyRecord>> {
        Ok(self
            .load(RecordKind::DeviceKey)?
            .map(PersistedRecord::into_device_key)
            .transpose()?)
    }

    async fn load_device_info(&self) -> Result<Option<DeviceInfo>> {
        Ok(self
            .load(RecordKind::DeviceInfo)?
            .map(PersistedRecord::into_device_info)
            .transpose()?)
    }

    async fn store_identity(&self, keys: &DeviceKeyRecord, info: &DeviceInfo) -> Result<()> {
        // Encode both before touching the map so a failure leaves no half-write.
        let keys_json = PersistedRecord::from(keys.clone()).to_json()?;
        let info_json = PersistedRecord::from(info.clone()).to_json()?;

        let mut records = self.records.write().map_err(|_| KeystoreError::Poisoned)?;
        records.insert(RecordKind::DeviceKey, keys_json);
        records.insert(RecordKind::DeviceInfo, info_json);
        Ok(())
    }

    async fn update_device_info(&self, info: &DeviceInfo) -> Result<()> {
        let info_json = PersistedRecord::from(info.clone()).to_json()?;

        let mut records = self.records.write().map_err(|_| KeystoreError::Poisoned)?;
        if !records.contains_key(&RecordKind::DeviceInfo) {
            return Err(KeystoreError::NotFound(RecordKind::DeviceInfo));
        }
        records.insert(RecordKind::DeviceInfo, info_json);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut records = self.records.write().map_err(|_| KeystoreError::Poisoned)?;
        records.clear();
        Ok(())
    }
}
