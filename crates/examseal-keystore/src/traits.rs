//! Keystore trait: the abstract interface for device identity persistence.
//!
//! The device manager receives a keystore at construction instead of
//! reaching for ambient local storage, so tests can substitute an in-memory
//! store and several device identities can coexist in one process.

use std::sync::Arc;

use async_trait::async_trait;
use examseal_core::{DeviceInfo, DeviceKeyRecord, RecordKind};

use crate::error::{KeystoreError, Result};

/// Async interface over the two records a device persists.
///
/// # Design Notes
///
/// - **Single writer**: one keystore belongs to one device identity. No
///   transaction discipline beyond writing the identity atomically.
/// - **Strict decoding**: records that fail to parse surface as
///   [`KeystoreError::Record`], never as absent.
#[async_trait]
pub trait Keystore: Send + Sync {
    /// Load the persisted key pair record.
    async fn load_key_record(&self) -> Result<Option<DeviceKeyRecord>>;

    /// Load the persisted device info record.
    async fn load_device_info(&self) -> Result<Option<DeviceInfo>>;

    /// Write both identity records atomically, replacing any existing ones.
    async fn store_identity(&self, keys: &DeviceKeyRecord, info: &DeviceInfo) -> Result<()>;

    /// Replace the device info record.
    ///
    /// Fails with [`KeystoreError::NotFound`] if no identity is stored.
    async fn update_device_info(&self, info: &DeviceInfo) -> Result<()>;

    /// Delete both records. Succeeds if nothing was stored.
    async fn clear(&self) -> Result<()>;
}

/// Extension trait for common keystore patterns.
pub trait KeystoreExt: Keystore {
    /// Load the full identity.
    ///
    /// `Ok(None)` when nothing is stored; [`KeystoreError::Incomplete`] when
    /// only one of the two records survived.
    fn load_identity(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<(DeviceKeyRecord, DeviceInfo)>>> + Send;
}

impl<K: Keystore + ?Sized> KeystoreExt for K {
    async fn load_identity(&self) -> Result<Option<(DeviceKeyRecord, DeviceInfo)>> {
        let keys = self.load_key_record().await?;
        let info = self.load_device_info().await?;

        match (keys, info) {
            (Some(keys), Some(info)) => Ok(Some((keys, info))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(KeystoreError::Incomplete {
                missing: RecordKind::DeviceInfo,
            }),
            (None, Some(_)) => Err(KeystoreError::Incomplete {
                missing: RecordKind::DeviceKey,
            }),
        }
    }
}

/// Shared keystores delegate to the inner store.
#[async_trait]
impl<K: Keystore + ?Sized> Keystore for Arc<K> {
    async fn load_key_record(&self) -> Result<Option<DeviceKeyRecord>> {
        (**self).load_key_record().await
    }

    async fn load_device_info(&self) -> Result<Option<DeviceInfo>> {
        (**self).load_device_info().await
    }

    async fn store_identity(&self, keys: &DeviceKeyRecord, info: &DeviceInfo) -> Result<()> {
        (**self).store_identity(keys, info).await
    }

    async fn update_device_info(&self, info: &DeviceInfo) -> Result<()> {
        (**self).update_device_info(info).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }
}
