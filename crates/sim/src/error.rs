//! Errors raised by the simulator outside the contract itself.

use std::path::PathBuf;

use snafu::Snafu;

use sollytch_ledger_types::ConfigError;
use sollytch_ledger_types::codec::CodecError;

/// Simulator failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SimError {
    /// A file could not be read.
    #[snafu(display("Cannot read {}: {source}", path.display()))]
    Read {
        /// File path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::SimConfig`].
    #[snafu(display("Cannot parse config {}: {source}", path.display()))]
    ParseConfig {
        /// Config path.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// The config parsed but holds an invalid value.
    #[snafu(display("{source}"))]
    InvalidConfig {
        /// The validation error.
        source: ConfigError,
    },

    /// Config or outcome output could not be produced.
    #[snafu(display("Cannot render output: {message}"))]
    Render {
        /// Error description.
        message: String,
    },

    /// A script line is not a valid step.
    #[snafu(display("Script line {line}: {source}"))]
    Script {
        /// One-based line number.
        line: usize,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A tree file is not a valid tree description.
    #[snafu(display("Invalid tree description: {source}"))]
    Tree {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A tree could not be encoded as a model payload.
    #[snafu(display("Cannot encode tree: {source}"))]
    Encode {
        /// The underlying codec error.
        source: CodecError,
    },

    /// The model key is not one of the classifier purposes.
    #[snafu(display("Unknown purpose {key}"))]
    UnknownPurpose {
        /// The rejected key.
        key: String,
    },

    /// Steps did not produce their expected status.
    #[snafu(display("{failed} of {total} steps did not meet expectations"))]
    Expectations {
        /// Steps whose status differed from the expected one.
        failed: usize,
        /// Steps run.
        total: usize,
    },
}
