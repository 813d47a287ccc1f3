//! Core types, errors, codec and configuration for the Sollytch custody chaincode.
//!
//! This crate provides the foundational types used throughout the chaincode:
//! - Ledger documents: test records, classifier models, image assets
//! - The transaction timestamp and record version rules
//! - Error types using snafu, with a numeric error-code catalog
//! - JSON, postcard and base64 codecs
//! - Argument validation and configuration

pub mod codec;
pub mod config;
pub mod error;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use config::{ChaincodeConfig, ClassifierConfig, ConfigError, ValidationConfig};
pub use error::{ChaincodeError, ErrorCode, Result};
pub use types::*;
