//! State-store capability injected into every invocation.
//!
//! [`ChaincodeStub`] is the only way the chaincode touches ledger state or the
//! transaction clock. The platform supplies an implementation per transaction;
//! [`crate::MemoryLedger`] provides one for tests and the simulator.

use snafu::{Location, Snafu};

use sollytch_ledger_types::error::UpstreamSnafu;
use sollytch_ledger_types::{ChaincodeError, TxTimestamp};

use crate::keys;

/// Errors reported by a state-store implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StubError {
    /// The state store could not serve the request.
    #[snafu(display("State store unavailable: {message}"))]
    Unavailable {
        /// Error description.
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The transaction carries no usable timestamp.
    #[snafu(display("Transaction timestamp unavailable: {message}"))]
    Clock {
        /// Error description.
        message: String,
    },

    /// A key or composite-key component is malformed.
    #[snafu(display("Invalid key {key:?}: {reason}"))]
    InvalidKey {
        /// The offending key or component.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A key read by the transaction changed before commit.
    #[snafu(display("MVCC read conflict on key {key:?}"))]
    ReadConflict {
        /// The key whose committed version moved.
        key: String,
    },
}

impl From<StubError> for ChaincodeError {
    fn from(err: StubError) -> Self {
        match err {
            StubError::InvalidKey { .. } => ChaincodeError::invalid_argument(err.to_string()),
            other => UpstreamSnafu { message: other.to_string() }.build(),
        }
    }
}

/// One key/value pair returned by a range or composite-key scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    /// Storage key.
    pub key: String,
    /// Stored bytes.
    pub value: Vec<u8>,
}

/// Per-transaction access to ledger state and the deterministic clock.
///
/// Reads observe committed state only. Writes are buffered by the platform and
/// become visible after commit, so a transaction never reads its own writes.
pub trait ChaincodeStub {
    /// Platform transaction identifier.
    fn tx_id(&self) -> &str;

    /// Deterministic transaction timestamp, identical on every validating node.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::Clock`] if the platform supplied no usable timestamp.
    fn tx_timestamp(&self) -> Result<TxTimestamp, StubError>;

    /// Reads the committed value at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StubError`] if the state store fails.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StubError>;

    /// Buffers a write of `value` at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::InvalidKey`] for an empty key, or another
    /// [`StubError`] if the state store fails.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StubError>;

    /// Scans simple keys in `[start, end)` in lexicographic order.
    ///
    /// An empty bound is open. Composite keys are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`StubError`] if the state store fails.
    fn get_state_by_range(&self, start: &str, end: &str) -> Result<Vec<StateEntry>, StubError>;

    /// Scans composite keys under `object_type` whose leading attributes equal
    /// `attributes`, in key byte order.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::InvalidKey`] for malformed components, or another
    /// [`StubError`] if the state store fails.
    fn get_state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> Result<Vec<StateEntry>, StubError>;

    /// Builds a composite key. See [`keys::create_composite_key`].
    ///
    /// # Errors
    ///
    /// Returns [`StubError::InvalidKey`] for malformed components.
    fn create_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> Result<String, StubError> {
        keys::create_composite_key(object_type, attributes)
    }

    /// Splits a composite key. See [`keys::split_composite_key`].
    ///
    /// # Errors
    ///
    /// Returns [`StubError::InvalidKey`] if `key` is not a composite key.
    fn split_composite_key(&self, key: &str) -> Result<(String, Vec<String>), StubError> {
        keys::split_composite_key(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use sollytch_ledger_types::ErrorCode;

    use super::*;

    #[test]
    fn test_invalid_key_maps_to_invalid_argument() {
        let err: ChaincodeError =
            StubError::InvalidKey { key: String::new(), reason: "empty".to_string() }.into();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_platform_failures_map_to_upstream() {
        let clock: ChaincodeError = ClockSnafu { message: "no header" }.build().into();
        assert_eq!(clock.code(), ErrorCode::Upstream);
        assert!(clock.to_string().contains("Transaction timestamp unavailable: no header"));

        let conflict: ChaincodeError = StubError::ReadConflict { key: "T1".to_string() }.into();
        assert!(conflict.is_retryable());

        let down: ChaincodeError = UnavailableSnafu { message: "peer gone" }.build().into();
        assert_eq!(down.code(), ErrorCode::Upstream);
    }
}
