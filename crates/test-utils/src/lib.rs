//! Shared test utilities for the Sollytch custody chaincode crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`TestDir`] - Managed temporary directory with path helpers
//! - [`fixtures`] - Sample records, hashes and transaction times
//! - [`strategies`] - Proptest generators for domain values

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod test_dir;
pub use test_dir::TestDir;

pub mod fixtures;
pub use fixtures::{sample_hash, sample_payload, sample_record, tx_time};

pub mod strategies;
