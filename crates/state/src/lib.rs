//! Ledger state access for the Sollytch custody chaincode.
//!
//! This crate sits between the platform's state store and the contract,
//! providing:
//!
//! - The [`ChaincodeStub`] capability and composite-key encoding
//! - An in-memory ledger reproducing platform transaction semantics
//! - Version and timestamp rules
//! - Typed documents sharing one key space
//! - Test record storage
//! - The parent → image secondary index and image storage

#![deny(unsafe_code)]

pub mod document;
mod images;
mod indexes;
pub mod keys;
mod memory;
mod records;
mod stub;
pub mod versioning;

pub use document::{Document, Stored};
pub use images::ImageStore;
pub use indexes::{INDEX_SENTINEL, IndexManager, PARENT_IMAGE_NAMESPACE};
pub use memory::{CommitReceipt, MemoryLedger, MemoryTransaction};
pub use records::RecordStore;
pub use stub::{ChaincodeStub, StateEntry, StubError};
