//! Replays scripts against an in-memory ledger.
//!
//! Every step runs in its own transaction. A successful write is committed;
//! a failed one is dropped, which discards its writes the way the platform
//! discards a failed transaction's write set. Read-only functions are
//! evaluated like queries and never committed.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use sollytch_ledger_chaincode::{Contract, ErrorDetails, Function, Response};
use sollytch_ledger_state::MemoryLedger;
use sollytch_ledger_types::TxTimestamp;

use crate::config::{ClockConfig, SimConfig};
use crate::error::SimError;
use crate::script::ScriptLine;

/// Result of one replayed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Script line of the step.
    pub line: usize,
    /// Transaction id used.
    pub tx_id: String,
    /// Function invoked.
    pub function: String,
    /// Response status.
    pub status: u16,
    /// Error text; empty on success.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Decoded payload: JSON when it parses, text otherwise.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    /// Error details on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    /// Ledger height after the commit; absent for failed and read-only steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    /// `false` when the step carried an `expect` the status did not meet.
    pub expectation_met: bool,
}

fn decode_payload(response: &Response) -> Value {
    if response.payload.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&response.payload).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&response.payload).into_owned())
    })
}

/// A contract bound to an in-memory ledger and a scripted clock.
#[derive(Debug)]
pub struct Simulator {
    ledger: MemoryLedger,
    contract: Contract,
    clock: ClockConfig,
    next_seconds: i64,
}

impl Simulator {
    /// Creates a simulator over an empty ledger.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            ledger: MemoryLedger::new(),
            contract: Contract::new(config.chaincode.clone()),
            clock: config.clock.clone(),
            next_seconds: config.clock.start_seconds,
        }
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    fn timestamp(&mut self, explicit: Option<TxTimestamp>) -> TxTimestamp {
        let timestamp = explicit.unwrap_or(TxTimestamp::new(self.next_seconds, 0));
        self.next_seconds = timestamp.seconds.saturating_add(self.clock.step_seconds);
        timestamp
    }

    /// Runs one step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] if the step's attached tree cannot be resolved.
    /// Contract failures are reported in the [`Outcome`], not as errors.
    pub fn step(&mut self, script_line: &ScriptLine) -> Result<Outcome, SimError> {
        let step = &script_line.step;
        let args = step.resolved_args()?;
        let tx_id = step.tx_id.clone().unwrap_or_else(|| format!("line-{}", script_line.line));
        let timestamp = self.timestamp(step.timestamp);

        let mut tx = self.ledger.begin(tx_id.clone(), timestamp);
        let mut response = self.contract.invoke(&mut tx, &step.function, &args);

        let read_only = Function::from_name(&step.function).is_some_and(Function::is_read_only);
        let mut height = None;
        if response.is_ok() && !read_only {
            match tx.commit() {
                Ok(receipt) => {
                    debug!(
                        tx_id = %tx_id,
                        height = receipt.height,
                        writes = receipt.writes,
                        "Committed"
                    );
                    height = Some(receipt.height);
                },
                Err(err) => response = Response::error(&err.into()),
            }
        }

        let expectation_met = step.expect.map_or(true, |expected| expected == response.status);
        if !expectation_met {
            warn!(
                line = script_line.line,
                function = %step.function,
                expected = step.expect,
                status = response.status,
                "Unexpected status"
            );
        }

        Ok(Outcome {
            line: script_line.line,
            tx_id,
            function: step.function.clone(),
            status: response.status,
            payload: decode_payload(&response),
            message: response.message,
            details: response.details,
            height,
            expectation_met,
        })
    }

    /// Runs every step in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`SimError`] raised by [`Simulator::step`].
    pub fn run(&mut self, script: &[ScriptLine]) -> Result<Vec<Outcome>, SimError> {
        let outcomes = script.iter().map(|line| self.step(line)).collect::<Result<Vec<_>, _>>()?;
        let failed = outcomes.iter().filter(|o| !o.expectation_met).count();
        info!(steps = outcomes.len(), failed, height = self.ledger.height(), "Script finished");
        Ok(outcomes)
    }
}

/// Fails when any outcome missed its expectation.
///
/// # Errors
///
/// Returns [`SimError::Expectations`] with the number of missed steps.
pub fn check_expectations(outcomes: &[Outcome]) -> Result<(), SimError> {
    let failed = outcomes.iter().filter(|o| !o.expectation_met).count();
    if failed > 0 {
        return Err(SimError::Expectations { failed, total: outcomes.len() });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use sollytch_ledger_test_utils::sample_payload;

    use super::*;
    use crate::script::parse_script;

    const SMOKE: &str = include_str!("../scripts/smoke.jsonl");

    #[test]
    fn test_smoke_script_meets_expectations() {
        let script = parse_script(SMOKE).unwrap();
        let mut sim = Simulator::new(&SimConfig::default());
        let outcomes = sim.run(&script).unwrap();
        check_expectations(&outcomes).unwrap();

        let labelled = outcomes.iter().find(|o| o.function == "storeTest" && o.status == 200);
        let record = &labelled.unwrap().payload;
        assert_eq!(record["qc_status"], "pass");
        assert_eq!(record["acao_recomendada"], "release");
    }

    #[test]
    fn test_failed_steps_are_not_committed() {
        let payload = serde_json::to_string(&sample_payload("T1")).unwrap();
        let text = format!(
            "{{\"function\":\"storeTest\",\"args\":[\"T1\",{payload}]}}\n\
             {{\"function\":\"storeTest\",\"args\":[\"T1\",{payload}],\"expect\":200}}\n"
        );
        let script = parse_script(&text).unwrap();
        let mut sim = Simulator::new(&SimConfig::default());
        let outcomes = sim.run(&script).unwrap();

        assert_eq!(outcomes[0].height, Some(1));
        assert_eq!(outcomes[1].status, 409);
        assert_eq!(outcomes[1].height, None);
        assert!(!outcomes[1].expectation_met);
        assert_eq!(sim.ledger().height(), 1);

        let err = check_expectations(&outcomes).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 steps did not meet expectations");
    }

    #[test]
    fn test_clock_advances_per_step() {
        let text = "{\"function\":\"storeImage\",\"args\":[\"i1\",\"P\",\"aa\"]}\n\
                    {\"function\":\"storeImage\",\"args\":[\"i1\",\"P\",\"bb\"],\
                    \"timestamp\":{\"seconds\":1704067300,\"nanos\":5}}\n\
                    {\"function\":\"storeImage\",\"args\":[\"i1\",\"P\",\"cc\"]}\n";
        let script = parse_script(text).unwrap();
        let mut sim = Simulator::new(&SimConfig::default());
        let outcomes = sim.run(&script).unwrap();

        assert_eq!(outcomes[0].payload["captured_at"], "2024-01-01T00:00:00.000000000Z");
        assert_eq!(outcomes[1].payload["last_updated_at"], "2024-01-01T00:01:40.000000005Z");
        assert_eq!(outcomes[2].payload["last_updated_at"], "2024-01-01T00:01:41.000000000Z");
        assert_eq!(outcomes[2].payload["version"], 3);
        assert_eq!(outcomes[0].tx_id, "line-1");
    }

    #[test]
    fn test_plain_text_payload() {
        let text = r#"{"function":"imageExists","args":["i1"],"expect":200}"#;
        let script = parse_script(text).unwrap();
        let outcome = Simulator::new(&SimConfig::default()).step(&script[0]).unwrap();
        assert_eq!(outcome.payload, Value::Bool(false));
        assert_eq!(outcome.height, None);
    }

    #[test]
    fn test_read_only_steps_are_not_committed() {
        let payload = serde_json::to_string(&sample_payload("T1")).unwrap();
        let text = format!(
            "{{\"function\":\"storeTest\",\"args\":[\"T1\",{payload}]}}\n\
             {{\"function\":\"queryTest\",\"args\":[\"T1\"]}}\n\
             {{\"function\":\"getAllTests\"}}\n"
        );
        let script = parse_script(&text).unwrap();
        let mut sim = Simulator::new(&SimConfig::default());
        let outcomes = sim.run(&script).unwrap();

        assert_eq!(outcomes[0].height, Some(1));
        assert_eq!(outcomes[1].status, 200);
        assert_eq!(outcomes[1].payload["test_id"], "T1");
        assert_eq!(outcomes[1].height, None);
        assert_eq!(outcomes[2].height, None);
        assert_eq!(sim.ledger().height(), 1);
    }
}
