//! Error types for the custody chaincode using snafu.
//!
//! Every failure surfaced to an invoking client is a [`ChaincodeError`]. Lower
//! layers (codec, state stub, classifier runtime) keep their own error enums and
//! are folded into this taxonomy at crate boundaries, where the caller knows
//! whether a decode failure means "bad input" or "corrupt ledger state".
//!
//! Each variant maps to an [`ErrorCode`] with a numeric identifier, a
//! retryability classification and a suggested recovery action.

use core::fmt;

use snafu::{Location, Snafu};

use crate::types::DocType;

/// Unified result type for chaincode operations.
pub type Result<T, E = ChaincodeError> = std::result::Result<T, E>;

/// Machine-readable error codes for programmatic error handling.
///
/// | Range     | Domain       | Examples                                   |
/// |-----------|--------------|--------------------------------------------|
/// | 1000–1099 | Caller input | Empty identifiers, wrong feature arity     |
/// | 1100–1199 | Ledger state | Undecodable values, dangling index entries |
/// | 2000–2099 | Platform     | State store or transaction clock failures  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Malformed or empty caller input.
    InvalidArgument = 1000,
    /// Key absent from the state store.
    NotFound = 1001,
    /// Create collided with an existing key.
    AlreadyExists = 1002,
    /// Feature row does not match the classifier column schema.
    SchemaMismatch = 1003,
    /// Stored bytes cannot be decoded, or an index entry points nowhere.
    Corrupt = 1100,
    /// The state store or the transaction clock failed.
    Upstream = 2000,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::InvalidArgument),
            1001 => Some(Self::NotFound),
            1002 => Some(Self::AlreadyExists),
            1003 => Some(Self::SchemaMismatch),
            1100 => Some(Self::Corrupt),
            2000 => Some(Self::Upstream),
            _ => None,
        }
    }

    /// Whether resubmitting the same transaction may succeed.
    ///
    /// Only platform failures are transient. Everything else is deterministic:
    /// every validating node would reach the same failure again.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Upstream)
    }

    /// Response status reported to the invoking client.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::InvalidArgument => 400,
            Self::NotFound => 404,
            Self::AlreadyExists => 409,
            Self::SchemaMismatch => 422,
            Self::Corrupt | Self::Upstream => 500,
        }
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::InvalidArgument => "Fix the request arguments and resubmit.",
            Self::NotFound => "Verify the identifier, or create the entity first.",
            Self::AlreadyExists => {
                "The identifier is taken. Use the update operation to change an existing record."
            },
            Self::SchemaMismatch => {
                "Send exactly the 21 feature columns in canonical order, or as a named JSON object."
            },
            Self::Corrupt => {
                "Ledger state cannot be decoded. Inspect the key's history and report the value."
            },
            Self::Upstream => {
                "Resubmit the transaction. The platform reported a transient failure."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Top-level error type for chaincode operations.
///
/// Any error aborts the whole transaction. The platform discards the tentative
/// write set, so nothing partially commits.
///
/// | Variant           | Retryable | Typical cause                                  |
/// | ----------------- | --------- | ---------------------------------------------- |
/// | `InvalidArgument` | No        | Empty id, bad purpose, malformed JSON or hash  |
/// | `NotFound`        | No        | Update or query of an unknown key              |
/// | `AlreadyExists`   | No        | Second create under the same test id           |
/// | `SchemaMismatch`  | No        | Feature row with the wrong number of columns   |
/// | `Corrupt`         | No        | Undecodable state, model rejected, dangling index |
/// | `Upstream`        | Yes       | State store or clock unavailable               |
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ChaincodeError {
    /// Malformed or empty caller input, rejected before any mutation.
    #[snafu(display("Invalid argument: {message}"))]
    InvalidArgument {
        /// Error description.
        message: String,
    },

    /// The requested key is absent.
    #[snafu(display("{kind} {key} not found"))]
    NotFound {
        /// Kind of entity that was looked up.
        kind: DocType,
        /// Storage key.
        key: String,
    },

    /// A strict create found the key already present.
    #[snafu(display("{kind} {key} already exists"))]
    AlreadyExists {
        /// Kind of entity being created.
        kind: DocType,
        /// Storage key.
        key: String,
    },

    /// The feature row does not match the classifier column schema.
    #[snafu(display("Feature schema mismatch: {message}"))]
    SchemaMismatch {
        /// Error description.
        message: String,
    },

    /// Stored state could not be decoded or is internally inconsistent.
    #[snafu(display("Corrupt state at key {key}: {message}"))]
    Corrupt {
        /// Storage key holding the offending value.
        key: String,
        /// Error description.
        message: String,
    },

    /// The platform's state store or transaction clock failed.
    #[snafu(display("Upstream failure at {location}: {message}"))]
    Upstream {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },
}

impl ChaincodeError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::Corrupt { .. } => ErrorCode::Corrupt,
            Self::Upstream { .. } => ErrorCode::Upstream,
        }
    }

    /// Whether this error is retryable. Delegates to [`ErrorCode::is_retryable`].
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Suggested recovery action. Delegates to [`ErrorCode::suggested_action`].
    #[must_use]
    pub const fn suggested_action(&self) -> &'static str {
        self.code().suggested_action()
    }

    /// Shorthand for an [`ChaincodeError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Shorthand for a [`ChaincodeError::Corrupt`] at `key`.
    pub fn corrupt(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Corrupt { key: key.into(), message: message.to_string() }
    }
}

impl From<crate::validation::ValidationError> for ChaincodeError {
    fn from(err: crate::validation::ValidationError) -> Self {
        Self::InvalidArgument { message: err.to_string() }
    }
}
