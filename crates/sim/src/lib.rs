//! Local simulator for the Sollytch custody chaincode.
//!
//! Replays JSON Lines invocation scripts against an in-memory ledger, one
//! transaction per step, and reports each response. Used to exercise the
//! contract end to end without a peer.

#![deny(unsafe_code)]

mod config;
mod error;
mod runner;
mod script;

pub use config::{ClockConfig, LogFormat, SimConfig, config_example, config_schema};
pub use error::SimError;
pub use runner::{Outcome, Simulator, check_expectations};
pub use script::{ScriptLine, Step, parse_script};
