//! Version and timestamp rules shared by every stored entity.
//!
//! Both values are pure functions of prior state and the transaction
//! timestamp, so every validating node computes the same result.

use sollytch_ledger_types::error::UpstreamSnafu;
use sollytch_ledger_types::{ChaincodeError, INITIAL_VERSION, Result};

use crate::stub::ChaincodeStub;

/// Version for the next write: [`INITIAL_VERSION`] on create, otherwise the
/// stored version plus one.
pub fn next_version(existing: Option<u64>) -> u64 {
    existing.map_or(INITIAL_VERSION, |v| v.saturating_add(1))
}

/// The transaction timestamp as RFC 3339 UTC with fixed nanosecond precision.
///
/// # Errors
///
/// Returns [`sollytch_ledger_types::ChaincodeError::Upstream`] if the platform
/// supplies no timestamp or the timestamp is out of range.
pub fn current_timestamp<S: ChaincodeStub + ?Sized>(stub: &S) -> Result<String> {
    let ts = stub.tx_timestamp()?;
    match ts.to_rfc3339() {
        Some(formatted) => Ok(formatted),
        None => UpstreamSnafu { message: format!("transaction timestamp {ts} is out of range") }
            .fail(),
    }
}

/// The transaction timestamp for an overwrite of a value last written at
/// `previous`.
///
/// Timestamps are fixed width, so string order is time order.
///
/// # Errors
///
/// Returns [`ChaincodeError::InvalidArgument`] if the transaction time is at
/// or before `previous`, or the errors of [`current_timestamp`].
pub fn advance_timestamp<S: ChaincodeStub + ?Sized>(stub: &S, previous: &str) -> Result<String> {
    let now = current_timestamp(stub)?;
    if now.as_str() <= previous {
        return Err(ChaincodeError::invalid_argument(format!(
            "transaction time {now} is not after last update {previous}"
        )));
    }
    Ok(now)
}
