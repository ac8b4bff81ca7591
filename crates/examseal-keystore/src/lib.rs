//! # ExamSeal Keystore
//!
//! Local persistence for a device's cryptographic identity. Provides a
//! trait-based interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! A device stores exactly two records: its key pair and its public identity
//! (see [`examseal_core::record`]). The [`Keystore`] trait is injected into
//! the device manager, so nothing reaches for ambient global storage.
//!
//! ## Key Types
//!
//! - [`Keystore`] - The async trait for identity persistence
//! - [`SqliteKeystore`] - SQLite-based durable storage, namespaced by profile
//! - [`MemoryKeystore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use examseal_keystore::{Keystore, KeystoreExt, SqliteKeystore};
//!
//! async fn example() {
//!     let store = SqliteKeystore::open("device.db").unwrap();
//!
//!     // A second identity in the same file
//!     let other = store.with_profile("secondary");
//!
//!     let identity = store.load_identity().await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic identity writes**: both records are written in one transaction
//! - **Strict decoding**: malformed records are errors, never "absent"
//! - **Partial state is detected**: one record without the other is
//!   [`KeystoreError::Incomplete`]

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{KeystoreError, Result};
pub use memory::MemoryKeystore;
pub use sqlite::{SqliteKeystore, DEFAULT_PROFILE};
pub use traits::{Keystore, KeystoreExt};
