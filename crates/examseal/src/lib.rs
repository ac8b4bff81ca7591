//! # ExamSeal
//!
//! End-to-end encryption for exam content delivered to registered devices.
//!
//! ## Overview
//!
//! - **Content encryption**: each content item is sealed under a fresh
//!   AES-256-GCM content key
//! - **Per-device wrapping**: the content key is wrapped with RSA-OAEP for
//!   each recipient's device public key
//! - **Device identity**: every installation lazily creates one RSA-2048 key
//!   pair and a fingerprint-derived device id, persisted in a local keystore
//! - **Revocation**: resetting a device destroys its private key, so content
//!   wrapped for it can no longer be opened there
//!
//! ## Usage
//!
//! ```rust,no_run
//! use examseal::{DeviceConfig, DeviceManager, Distributor};
//! use examseal::collaborators::{MemoryContentRepository, MemoryDirectory};
//! use examseal::core::ContentId;
//! use examseal::keystore::SqliteKeystore;
//!
//! async fn example() {
//!     // One identity per installation
//!     let keystore = SqliteKeystore::open("device.db").unwrap();
//!     let device = DeviceManager::new(keystore, DeviceConfig::from_env());
//!     let info = device.initialize_device().await.unwrap();
//!
//!     // Collaborator side
//!     let distributor = Distributor::new(MemoryDirectory::new(), MemoryContentRepository::new());
//!     distributor.register_device(&device).await.unwrap();
//!
//!     let content_id = ContentId::new("exam-2024-physics").unwrap();
//!     distributor
//!         .distribute(&content_id, b"Question 1...", &[info.device_id])
//!         .await
//!         .unwrap();
//!
//!     // Device side
//!     let plaintext = distributor.receive(&device, &content_id).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `examseal::core` - Identifiers, persisted records, base64 encoding
//! - `examseal::crypto` - Content keys, device keys, wrapping, envelopes
//! - `examseal::keystore` - Keystore trait with SQLite and in-memory backends

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod device;
pub mod distribution;
pub mod error;
pub mod fingerprint;

// Re-export component crates
pub use examseal_core as core;
pub use examseal_crypto as crypto;
pub use examseal_keystore as keystore;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{ContentRepository, DeviceDirectory};
pub use config::DeviceConfig;
pub use device::DeviceManager;
pub use distribution::{DistributionReport, Distributor};
pub use error::{ErrorKind, ExamsealError, FailureClass, Result};
pub use fingerprint::{EnvironmentProbe, EnvironmentSignals, StaticEnvironment, SystemEnvironment};

// Re-export commonly used types
pub use examseal_core::{ContentId, DeviceId, DeviceInfo, DeviceRegistration};
pub use examseal_crypto::{
    ContentEnvelope, ContentKey, CryptoError, DevicePrivateKey, DevicePublicKey,
    EncryptedPayload, WrappedKeyRecord,
};
