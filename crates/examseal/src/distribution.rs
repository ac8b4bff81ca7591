//! Sealing content for a set of devices and fetching it back.
//!
//! The [`Distributor`] plays the collaborator's side: it looks recipient
//! public keys up in a [`DeviceDirectory`], seals the content once under a
//! fresh content key wrapped per device, and stores the envelope in a
//! [`ContentRepository`]. Devices only ever see their own wrapped copy.

use examseal_core::{ContentId, DeviceId, DeviceRegistration};
use examseal_crypto::{ContentEnvelopeBuilder, DevicePublicKey};
use examseal_keystore::Keystore;

use crate::collaborators::{ContentRepository, DeviceDirectory};
use crate::device::DeviceManager;
use crate::error::{ExamsealError, Result};

/// Outcome of [`Distributor::distribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionReport {
    pub content_id: ContentId,
    /// Devices a wrapped key was issued for, in request order.
    pub wrapped_for: Vec<DeviceId>,
    /// Requested devices the directory does not know.
    pub skipped: Vec<DeviceId>,
}

/// Seals content for registered devices.
pub struct Distributor<D, R> {
    directory: D,
    repository: R,
}

impl<D: DeviceDirectory, R: ContentRepository> Distributor<D, R> {
    pub fn new(directory: D, repository: R) -> Self {
        Self {
            directory,
            repository,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Publish an initialized device's public key to the directory.
    pub async fn register_device<K: Keystore>(
        &self,
        device: &DeviceManager<K>,
    ) -> Result<DeviceRegistration> {
        let registration = device.registration().await?;
        self.directory
            .register(&registration)
            .await
            .map_err(ExamsealError::Collaborator)?;

        tracing::info!(device_id = %registration.device_id, "device registered");
        Ok(registration)
    }

    /// Seal `plaintext` for every known device in `recipients` and store it.
    ///
    /// Devices missing from the directory are reported as skipped. A stored
    /// public key that fails to import aborts the distribution, since it
    /// means the directory is corrupt. Fails with
    /// [`ExamsealError::NoRecipients`] if nobody could be addressed.
    pub async fn distribute(
        &self,
        content_id: &ContentId,
        plaintext: &[u8],
        recipients: &[DeviceId],
    ) -> Result<DistributionReport> {
        let mut builder = ContentEnvelopeBuilder::new(plaintext)?;
        let mut wrapped_for = Vec::new();
        let mut skipped = Vec::new();

        for device_id in recipients {
            if wrapped_for.contains(device_id) || skipped.contains(device_id) {
                continue;
            }

            match self.lookup(device_id).await? {
                Some(public_key) => {
                    builder = builder.recipient(device_id.clone(), &public_key)?;
                    wrapped_for.push(device_id.clone());
                }
                None => {
                    tracing::warn!(%device_id, %content_id, "skipping unregistered device");
                    skipped.push(device_id.clone());
                }
            }
        }

        if wrapped_for.is_empty() {
            return Err(ExamsealError::NoRecipients(content_id.clone()));
        }

        let envelope = builder.build()?;
        self.repository
            .put_envelope(content_id, &envelope)
            .await
            .map_err(ExamsealError::Collaborator)?;

        tracing::info!(
            %content_id,
            recipients = wrapped_for.len(),
            skipped = skipped.len(),
            "content distributed"
        );

        Ok(DistributionReport {
            content_id: content_id.clone(),
            wrapped_for,
            skipped,
        })
    }

    /// Give a device registered after distribution access to existing
    /// content.
    ///
    /// `holder` must be a current recipient: the content key is recovered
    /// with its private key and re-wrapped for `device_id`. Nothing else in
    /// the envelope changes.
    pub async fn extend_to<K: Keystore>(
        &self,
        content_id: &ContentId,
        holder: &DeviceManager<K>,
        device_id: &DeviceId,
    ) -> Result<()> {
        let mut envelope = self.fetch(content_id).await?;
        let public_key = self
            .lookup(device_id)
            .await?
            .ok_or_else(|| ExamsealError::UnknownDevice(device_id.clone()))?;

        let content_key = holder.envelope_key(&envelope).await?;
        envelope.add_recipient(&content_key, device_id.clone(), &public_key)?;

        self.repository
            .put_envelope(content_id, &envelope)
            .await
            .map_err(ExamsealError::Collaborator)?;

        tracing::info!(%content_id, %device_id, "recipient added to content");
        Ok(())
    }

    /// Fetch content and open it with `device`'s key.
    pub async fn receive<K: Keystore>(
        &self,
        device: &DeviceManager<K>,
        content_id: &ContentId,
    ) -> Result<Vec<u8>> {
        let envelope = self.fetch(content_id).await?;
        device.open_envelope(&envelope).await
    }

    async fn fetch(&self, content_id: &ContentId) -> Result<examseal_crypto::ContentEnvelope> {
        self.repository
            .get_envelope(content_id)
            .await
            .map_err(ExamsealError::Collaborator)?
            .ok_or_else(|| ExamsealError::ContentNotFound(content_id.clone()))
    }

    async fn lookup(&self, device_id: &DeviceId) -> Result<Option<DevicePublicKey>> {
        let text = self
            .directory
            .public_key(device_id)
            .await
            .map_err(ExamsealError::Collaborator)?;

        Ok(text.map(|t| DevicePublicKey::import(&t)).transpose()?)
    }
}
