//! Simulator configuration.
//!
//! Loaded from a TOML file whose `[chaincode]` table is the contract's
//! [`ChaincodeConfig`]. Every field has a default, so an empty file is valid.

use std::path::Path;

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use sollytch_ledger_types::ChaincodeConfig;

use crate::error::{InvalidConfigSnafu, ParseConfigSnafu, ReadSnafu, SimError};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per event.
    Json,
    /// JSON when stderr is not a terminal, text otherwise.
    #[default]
    Auto,
}

/// Transaction clock used for replayed steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClockConfig {
    /// Seconds since the Unix epoch of the first step.
    #[serde(default = "default_start_seconds")]
    pub start_seconds: i64,
    /// Seconds added for each following step without an explicit timestamp.
    #[serde(default = "default_step_seconds")]
    pub step_seconds: i64,
}

fn default_start_seconds() -> i64 {
    1_704_067_200
}

fn default_step_seconds() -> i64 {
    1
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { start_seconds: default_start_seconds(), step_seconds: default_step_seconds() }
    }
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SimConfig {
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Transaction clock.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Contract configuration.
    #[serde(default)]
    pub chaincode: ChaincodeConfig,
}

impl SimConfig {
    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if the file cannot be read, is not valid TOML for
    /// this structure, or holds an invalid value.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        let config: Self = toml::from_str(&text).context(ParseConfigSnafu { path })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the contract section and the clock.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] on the first invalid value.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.clock.step_seconds < 1 {
            return Err(SimError::InvalidConfig {
                source: sollytch_ledger_types::ConfigError::Validation {
                    message: "clock.step_seconds must be >= 1".to_string(),
                },
            });
        }
        self.chaincode.validate().context(InvalidConfigSnafu)
    }
}

/// JSON Schema of [`SimConfig`], pretty-printed.
///
/// # Errors
///
/// Returns [`SimError::Render`] if the schema cannot be serialized.
pub fn config_schema() -> Result<String, SimError> {
    let schema = schemars::schema_for!(SimConfig);
    serde_json::to_string_pretty(&schema)
        .map_err(|err| SimError::Render { message: err.to_string() })
}

/// A TOML config file holding every default.
///
/// # Errors
///
/// Returns [`SimError::Render`] if the defaults cannot be serialized.
pub fn config_example() -> Result<String, SimError> {
    toml::to_string_pretty(&SimConfig::default())
        .map_err(|err| SimError::Render { message: err.to_string() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use sollytch_ledger_test_utils::TestDir;

    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let dir = TestDir::new();
        let path = dir.write_file("sim.toml", "");
        assert_eq!(SimConfig::load(&path).unwrap(), SimConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TestDir::new();
        let path = dir.write_file(
            "sim.toml",
            "log_format = \"json\"\n\n[chaincode.classifier]\ncache_enabled = true\n",
        );
        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.chaincode.classifier.cache_enabled);
        assert_eq!(config.chaincode.classifier.max_tree_depth, 64);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TestDir::new();
        let path = dir.write_file("sim.toml", "[chaincode.classifier]\nmax_tree_depth = 0\n");
        assert!(matches!(SimConfig::load(&path), Err(SimError::InvalidConfig { .. })));

        let path = dir.write_file("clock.toml", "[clock]\nstep_seconds = 0\n");
        assert!(matches!(SimConfig::load(&path), Err(SimError::InvalidConfig { .. })));

        let path = dir.write_file("bad.toml", "log_format = 3\n");
        assert!(matches!(SimConfig::load(&path), Err(SimError::ParseConfig { .. })));

        let missing = dir.join("missing.toml");
        assert!(matches!(SimConfig::load(&missing), Err(SimError::Read { .. })));
    }

    #[test]
    fn test_example_roundtrips() {
        let example = config_example().unwrap();
        let dir = TestDir::new();
        let path = dir.write_file("example.toml", &example);
        assert_eq!(SimConfig::load(&path).unwrap(), SimConfig::default());
    }

    #[test]
    fn test_schema_names_sections() {
        let schema = config_schema().unwrap();
        for section in ["log_format", "clock", "chaincode"] {
            assert!(schema.contains(section), "{section}");
        }
    }
}
