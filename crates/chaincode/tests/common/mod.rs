//! Harness for contract integration tests.
//!
//! Each [`Harness::invoke`] runs in its own transaction on a shared in-memory
//! ledger, one clock second after the previous one, and commits only when the
//! invocation succeeded, mirroring how the platform treats a failed response.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use std::cell::Cell;

use serde_json::Value;
use sollytch_ledger_chaincode::{Contract, Response};
use sollytch_ledger_classifier::{DecisionTree, FeatureRow, NodeSpec};
use sollytch_ledger_state::MemoryLedger;
use sollytch_ledger_test_utils::{sample_record, tx_time};
use sollytch_ledger_types::{ChaincodeConfig, Purpose};

/// A contract bound to an in-memory ledger with a ticking transaction clock.
pub struct Harness {
    pub ledger: MemoryLedger,
    pub contract: Contract,
    clock: Cell<i64>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ChaincodeConfig::default())
    }

    pub fn with_config(config: ChaincodeConfig) -> Self {
        Self { ledger: MemoryLedger::new(), contract: Contract::new(config), clock: Cell::new(0) }
    }

    /// Seconds on the transaction clock of the next invocation.
    pub fn next_second(&self) -> i64 {
        self.clock.get() + 1
    }

    /// Makes the next invocation run at `second`, which may be in the past.
    pub fn set_next_second(&self, second: i64) {
        self.clock.set(second - 1);
    }

    /// Runs one invocation in a fresh transaction, committing on success.
    pub fn invoke(&self, function: &str, args: &[&str]) -> Response {
        let second = self.next_second();
        self.clock.set(second);
        let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();

        let mut tx = self.ledger.begin(format!("tx-{second}"), tx_time(second));
        let response = self.contract.invoke(&mut tx, function, &args);
        if response.is_ok() {
            tx.commit().expect("single-writer commit");
        }
        response
    }

    /// Invokes and decodes a successful JSON payload.
    pub fn ok_json(&self, function: &str, args: &[&str]) -> Value {
        let response = self.invoke(function, args);
        assert!(response.is_ok(), "{function} failed: {}", response.message);
        serde_json::from_slice(&response.payload).expect("JSON payload")
    }

    /// Stores a model for `purpose` built from `root`.
    pub fn install(&self, purpose: Purpose, root: NodeSpec) -> Value {
        let data = model_data(purpose, root);
        self.ok_json("storeModel", &[purpose.key(), &data])
    }

    /// Installs one classifier per purpose over the sample feature row:
    /// action `release`, result class `negative`, QC `pass`.
    pub fn install_models(&self) {
        self.install(
            Purpose::RecommendedAction,
            NodeSpec::threshold(
                "estimated_concentration_ppb",
                5.0,
                NodeSpec::leaf("release"),
                NodeSpec::leaf("retest"),
            ),
        );
        self.install(
            Purpose::ResultClass,
            NodeSpec::category(
                "control_line_ok",
                vec![("true", NodeSpec::leaf("negative"))],
                NodeSpec::leaf("invalid"),
            ),
        );
        self.install(
            Purpose::QcStatus,
            NodeSpec::category(
                "controle_interno_result",
                vec![("pass", NodeSpec::leaf("pass"))],
                NodeSpec::leaf("fail"),
            ),
        );
    }
}

/// Base64 model payload of a tree predicting `purpose`.
pub fn model_data(purpose: Purpose, root: NodeSpec) -> String {
    DecisionTree::from_spec(purpose.key(), root).to_base64().unwrap()
}

/// The positional feature row of [`sample_record`].
pub fn sample_row() -> String {
    FeatureRow::from_record(&sample_record("row")).unwrap().values().join(",")
}
