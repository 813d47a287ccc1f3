//! Invocation scripts.
//!
//! A script is JSON Lines: one step object per line. Blank lines and lines
//! starting with `#` are skipped.
//!
//! ```text
//! # install a classifier from an inline tree, then store a labelled test
//! {"function": "storeModel", "args": ["qc_status"], "tree": {"leaf": "pass"}}
//! {"function": "storeTest", "args": ["T1", "{\"test_id\":\"T1\"}"], "expect": 200}
//! ```
//!
//! A step with a `tree` gets the tree's base64 model payload appended to its
//! arguments, so scripts can install classifiers without pre-encoding them.

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use sollytch_ledger_classifier::{DecisionTree, NodeSpec, parse_purpose};
use sollytch_ledger_types::TxTimestamp;

use crate::error::{EncodeSnafu, ScriptSnafu, SimError};

/// One scripted invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Function name.
    pub function: String,
    /// Positional string arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Transaction id; generated from the line number when absent.
    #[serde(default)]
    pub tx_id: Option<String>,
    /// Transaction time; the simulator clock when absent.
    #[serde(default)]
    pub timestamp: Option<TxTimestamp>,
    /// Tree whose model payload is appended to `args`.
    #[serde(default)]
    pub tree: Option<NodeSpec>,
    /// Expected response status.
    #[serde(default)]
    pub expect: Option<u16>,
}

impl Step {
    /// Arguments to invoke with, including the encoded `tree` if present.
    ///
    /// The tree predicts the purpose named by the first argument.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownPurpose`] if a tree is attached and the first
    /// argument is not a purpose key, or [`SimError::Encode`] if the tree
    /// cannot be serialized.
    pub fn resolved_args(&self) -> Result<Vec<String>, SimError> {
        let mut args = self.args.clone();
        if let Some(root) = &self.tree {
            let key = args.first().map(String::as_str).unwrap_or_default();
            let purpose = parse_purpose(key)
                .map_err(|_| SimError::UnknownPurpose { key: key.to_string() })?;
            let tree = DecisionTree::from_spec(purpose.key(), root.clone());
            args.push(tree.to_base64().context(EncodeSnafu)?);
        }
        Ok(args)
    }
}

/// A step with its one-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    /// One-based line number.
    pub line: usize,
    /// The step.
    pub step: Step,
}

/// Parses script text.
///
/// # Errors
///
/// Returns [`SimError::Script`] naming the first line that is not a step.
pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>, SimError> {
    text.lines()
        .enumerate()
        .map(|(index, raw)| (index + 1, raw.trim()))
        .filter(|(_, raw)| !raw.is_empty() && !raw.starts_with('#'))
        .map(|(line, raw)| {
            let step = serde_json::from_str(raw).context(ScriptSnafu { line })?;
            Ok(ScriptLine { line, step })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "# header\n\n{\"function\":\"getAllTests\"}\n  \n{\"function\":\"queryTest\",\
                    \"args\":[\"T1\"],\"expect\":404}\n";
        let lines = parse_script(text).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 3);
        assert!(lines[0].step.args.is_empty());
        assert_eq!(lines[1].line, 5);
        assert_eq!(lines[1].step.expect, Some(404));
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = parse_script("{\"function\":\"getAllTests\"}\n{\"fn\":1}\n").unwrap_err();
        assert!(matches!(err, SimError::Script { line: 2, .. }));
    }

    #[test]
    fn test_tree_appends_payload() {
        let line = r#"{"function":"storeModel","args":["qc_status"],"tree":{"leaf":"pass"}}"#;
        let step = &parse_script(line).unwrap()[0].step;
        let args = step.resolved_args().unwrap();
        assert_eq!(args.len(), 2);

        let bytes = sollytch_ledger_types::codec::decode_base64(&args[1]).unwrap();
        let tree = DecisionTree::from_bytes(&bytes).unwrap();
        assert_eq!(tree.class_attribute(), "qc_status");
    }

    #[test]
    fn test_tree_requires_purpose() {
        let line = r#"{"function":"storeModel","args":["risk"],"tree":{"leaf":"pass"}}"#;
        let step = &parse_script(line).unwrap()[0].step;
        assert!(matches!(step.resolved_args(), Err(SimError::UnknownPurpose { .. })));
    }
}
