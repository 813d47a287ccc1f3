//! Configuration types for the custody chaincode.
//!
//! Configuration is deserialized from TOML by the host (see the `sim` binary)
//! or built in code with fallible builders. Builders call `validate()`; after
//! deserialization, call [`ChaincodeConfig::validate`] explicitly.
//!
//! Nothing here may change results between validating nodes: limits only
//! reject inputs, and the classifier cache is keyed by model version.

// The schemars `JsonSchema` derive expands to code using `.unwrap()`.
#![allow(clippy::disallowed_methods)]

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Configuration validation error.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation { message: message.into() }
}

// =============================================================================
// Input Validation Limits
// =============================================================================

const fn default_max_key_bytes() -> usize {
    256
}

const fn default_max_payload_bytes() -> usize {
    1024 * 1024 // 1 MB
}

const fn default_max_model_payload_bytes() -> usize {
    16 * 1024 * 1024 // 16 MB
}

const fn default_max_hash_hex_chars() -> usize {
    128 // SHA-512
}

/// Limits applied to invocation arguments before any state access.
///
/// # Example
///
/// ```no_run
/// # use sollytch_ledger_types::config::ValidationConfig;
/// let config = ValidationConfig::builder()
///     .max_key_bytes(128)
///     .build()
///     .expect("valid validation config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationConfig {
    /// Maximum identifier length in bytes (test, image and parent ids).
    ///
    /// Must be >= 1. Default: 256.
    #[serde(default = "default_max_key_bytes")]
    pub max_key_bytes: usize,
    /// Maximum JSON record payload size in bytes.
    ///
    /// Must be >= 2. Default: 1 MB.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Maximum base64 classifier payload size in bytes.
    ///
    /// Must be >= 4. Default: 16 MB.
    #[serde(default = "default_max_model_payload_bytes")]
    pub max_model_payload_bytes: usize,
    /// Maximum image hash length in hex characters.
    ///
    /// Must be even and >= 2. Default: 128.
    #[serde(default = "default_max_hash_hex_chars")]
    pub max_hash_hex_chars: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_key_bytes: default_max_key_bytes(),
            max_payload_bytes: default_max_payload_bytes(),
            max_model_payload_bytes: default_max_model_payload_bytes(),
            max_hash_hex_chars: default_max_hash_hex_chars(),
        }
    }
}

#[bon::bon]
impl ValidationConfig {
    /// Creates a new validation configuration, verifying every limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is below its minimum.
    #[builder]
    pub fn new(
        #[builder(default = default_max_key_bytes())] max_key_bytes: usize,
        #[builder(default = default_max_payload_bytes())] max_payload_bytes: usize,
        #[builder(default = default_max_model_payload_bytes())] max_model_payload_bytes: usize,
        #[builder(default = default_max_hash_hex_chars())] max_hash_hex_chars: usize,
    ) -> Result<Self, ConfigError> {
        let config =
            Self { max_key_bytes, max_payload_bytes, max_model_payload_bytes, max_hash_hex_chars };
        config.validate()?;
        Ok(config)
    }
}

impl ValidationConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is below its minimum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_key_bytes == 0 {
            return Err(invalid("max_key_bytes must be >= 1"));
        }
        if self.max_payload_bytes < 2 {
            return Err(invalid("max_payload_bytes must be >= 2"));
        }
        if self.max_model_payload_bytes < 4 {
            return Err(invalid("max_model_payload_bytes must be >= 4"));
        }
        if self.max_hash_hex_chars < 2 || self.max_hash_hex_chars % 2 != 0 {
            return Err(invalid("max_hash_hex_chars must be an even number >= 2"));
        }
        Ok(())
    }
}

// =============================================================================
// Classifier Runtime
// =============================================================================

const fn default_max_tree_depth() -> usize {
    64
}

/// Classifier loading and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifierConfig {
    /// Directory for staged classifier artifacts. `None` uses the OS temp dir.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    /// Keep decoded classifiers in memory keyed by (purpose, version).
    ///
    /// Default: false (every invocation loads from the ledger).
    #[serde(default)]
    pub cache_enabled: bool,
    /// Deepest decision tree the runtime accepts. Deeper trees are rejected as corrupt.
    ///
    /// Must be >= 1. Default: 64.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { staging_dir: None, cache_enabled: false, max_tree_depth: default_max_tree_depth() }
    }
}

#[bon::bon]
impl ClassifierConfig {
    /// Creates a new classifier configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `max_tree_depth` is zero.
    #[builder]
    pub fn new(
        staging_dir: Option<PathBuf>,
        #[builder(default)] cache_enabled: bool,
        #[builder(default = default_max_tree_depth())] max_tree_depth: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { staging_dir, cache_enabled, max_tree_depth };
        config.validate()?;
        Ok(config)
    }
}

impl ClassifierConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `max_tree_depth` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tree_depth == 0 {
            return Err(invalid("max_tree_depth must be >= 1"));
        }
        Ok(())
    }
}

// =============================================================================
// Top Level
// =============================================================================

fn default_image_index_namespace() -> String {
    "parent~image".to_string()
}

/// Complete chaincode configuration.
///
/// # Example
///
/// ```no_run
/// # use sollytch_ledger_types::config::{ChaincodeConfig, ClassifierConfig};
/// let config = ChaincodeConfig::builder()
///     .classifier(ClassifierConfig::builder().cache_enabled(true).build().expect("valid"))
///     .build()
///     .expect("valid chaincode config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChaincodeConfig {
    /// Argument limits.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Classifier runtime settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Composite-key namespace of the parent → image index.
    ///
    /// Changing it on a live ledger orphans existing index entries.
    #[serde(default = "default_image_index_namespace")]
    pub image_index_namespace: String,
}

impl Default for ChaincodeConfig {
    fn default() -> Self {
        Self {
            validation: ValidationConfig::default(),
            classifier: ClassifierConfig::default(),
            image_index_namespace: default_image_index_namespace(),
        }
    }
}

#[bon::bon]
impl ChaincodeConfig {
    /// Creates a new chaincode configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any nested section is invalid or
    /// the index namespace is unusable.
    #[builder]
    pub fn new(
        #[builder(default)] validation: ValidationConfig,
        #[builder(default)] classifier: ClassifierConfig,
        #[builder(default = default_image_index_namespace())] image_index_namespace: String,
    ) -> Result<Self, ConfigError> {
        let config = Self { validation, classifier, image_index_namespace };
        config.validate()?;
        Ok(config)
    }
}

impl ChaincodeConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validation.validate()?;
        self.classifier.validate()?;
        if self.image_index_namespace.is_empty() {
            return Err(invalid("image_index_namespace must not be empty"));
        }
        if self.image_index_namespace.contains(&crate::validation::RESERVED_KEY_CHARS[..]) {
            return Err(invalid("image_index_namespace contains a reserved delimiter"));
        }
        Ok(())
    }
}
