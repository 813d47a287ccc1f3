//! Invocation surface of the Sollytch custody chaincode.
//!
//! The platform hands every transaction to [`Contract::invoke`] with a
//! function name and positional string arguments. The contract records
//! diagnostic test events, labels them with ledger-stored classifiers, and
//! tracks image integrity hashes linked to their parent entity.

#![deny(unsafe_code)]

mod contract;
mod function;
mod response;

pub use contract::Contract;
pub use function::Function;
pub use response::{ErrorDetails, OK, Response};
