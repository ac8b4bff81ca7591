//! # ExamSeal Testkit
//!
//! Testing utilities for ExamSeal.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Known-answer vectors**: AES-256-GCM and base64 cases with published
//!   outputs, for checking the primitives against other implementations
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: In-memory devices with deterministic fingerprints and
//!   clocks
//!
//! ## Known-Answer Vectors
//!
//! ```rust
//! use examseal_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "{} failed", name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use examseal_testkit::generators::plaintext;
//!
//! proptest! {
//!     #[test]
//!     fn round_trip(p in plaintext(4096)) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use examseal_testkit::fixtures::device_fleet;
//!
//! let fleet = device_fleet(3).await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{device_fleet, TestDevice};
