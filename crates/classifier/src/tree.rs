//! Decision-tree classifier runtime.
//!
//! A tree is stored as a flat node table rooted at index 0. Every child index
//! is strictly greater than its parent's, so a walk always terminates and
//! decoding never recurses, whatever bytes arrive from the ledger.
//!
//! Trees are authored as nested [`NodeSpec`] values (in code or JSON) and
//! flattened with [`DecisionTree::from_spec`]. Training is out of scope.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use sollytch_ledger_types::codec::{self, CodecError};

use crate::dataset::{Cell, Dataset};

/// Errors raised while loading or evaluating a classifier.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RuntimeError {
    /// The staged artifact could not be read.
    #[snafu(display("Cannot read classifier artifact {path}: {source}"))]
    Io {
        /// Artifact path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The artifact bytes are not a serialized tree.
    #[snafu(display("Cannot decode classifier: {source}"))]
    Decode {
        /// The underlying codec error.
        source: CodecError,
    },

    /// The tree is structurally invalid.
    #[snafu(display("Invalid classifier: {message}"))]
    Invalid {
        /// What is wrong with the tree.
        message: String,
    },

    /// The dataset lacks a column the tree splits on.
    #[snafu(display("Dataset has no attribute {attribute}"))]
    UnknownAttribute {
        /// Attribute name.
        attribute: String,
    },

    /// A numeric split met a non-numeric value.
    #[snafu(display("Attribute {attribute} value {value:?} is not numeric"))]
    NotNumeric {
        /// Attribute name.
        attribute: String,
        /// Offending cell text.
        value: String,
    },

    /// A split met a missing value.
    #[snafu(display("Attribute {attribute} is missing in row {row}"))]
    MissingValue {
        /// Attribute name.
        attribute: String,
        /// Zero-based row index.
        row: usize,
    },
}

/// One node of the flat node table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node carrying the predicted label.
    Leaf {
        /// Predicted class label.
        label: String,
    },
    /// Numeric split: `value <= threshold` goes to `below`, otherwise `above`.
    Threshold {
        /// Attribute to test.
        attribute: String,
        /// Split point.
        threshold: f64,
        /// Node index for values at or under the threshold.
        below: u32,
        /// Node index for values over the threshold.
        above: u32,
    },
    /// Categorical split on the cell's exact text.
    Category {
        /// Attribute to test.
        attribute: String,
        /// `(value, node index)` pairs.
        branches: Vec<(String, u32)>,
        /// Node index for values without a branch.
        fallback: u32,
    },
}

/// Nested authoring form of a tree, flattened by [`DecisionTree::from_spec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSpec {
    /// Terminal node.
    Leaf(String),
    /// Numeric split.
    Threshold {
        /// Attribute to test.
        attribute: String,
        /// Split point.
        threshold: f64,
        /// Subtree for values at or under the threshold.
        below: Box<NodeSpec>,
        /// Subtree for values over the threshold.
        above: Box<NodeSpec>,
    },
    /// Categorical split.
    Category {
        /// Attribute to test.
        attribute: String,
        /// `(value, subtree)` pairs.
        branches: Vec<(String, NodeSpec)>,
        /// Subtree for values without a branch.
        fallback: Box<NodeSpec>,
    },
}

impl NodeSpec {
    /// A leaf predicting `label`.
    pub fn leaf(label: impl Into<String>) -> Self {
        Self::Leaf(label.into())
    }

    /// A numeric split on `attribute`.
    pub fn threshold(
        attribute: impl Into<String>,
        threshold: f64,
        below: NodeSpec,
        above: NodeSpec,
    ) -> Self {
        Self::Threshold {
            attribute: attribute.into(),
            threshold,
            below: Box::new(below),
            above: Box::new(above),
        }
    }

    /// A categorical split on `attribute`.
    pub fn category(
        attribute: impl Into<String>,
        branches: Vec<(&str, NodeSpec)>,
        fallback: NodeSpec,
    ) -> Self {
        Self::Category {
            attribute: attribute.into(),
            branches: branches.into_iter().map(|(v, n)| (v.to_string(), n)).collect(),
            fallback: Box::new(fallback),
        }
    }
}

/// A decision-tree classifier predicting one class attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    class_attribute: String,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Flattens a nested tree in pre-order, so children follow their parent.
    pub fn from_spec(class_attribute: impl Into<String>, root: NodeSpec) -> Self {
        let mut nodes = Vec::new();
        flatten(root, &mut nodes);
        Self { class_attribute: class_attribute.into(), nodes }
    }

    /// Builds a tree from a raw node table without checking it.
    ///
    /// Call [`DecisionTree::validate`] before evaluating such a tree.
    pub fn from_nodes(class_attribute: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self { class_attribute: class_attribute.into(), nodes }
    }

    /// The attribute this tree predicts.
    pub fn class_attribute(&self) -> &str {
        &self.class_attribute
    }

    /// The node table, root first.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Serializes the tree with postcard.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Serializes the tree as a base64 ledger payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    pub fn to_base64(&self) -> Result<String, CodecError> {
        Ok(codec::encode_base64(&self.to_bytes()?))
    }

    /// Deserializes a tree from postcard bytes. Does not validate.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Decode`] if the bytes are not a tree.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RuntimeError> {
        codec::decode(bytes).context(DecodeSnafu)
    }

    /// Reads and deserializes a tree from a staged artifact. Does not validate.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Io`] if the file cannot be read, or
    /// [`RuntimeError::Decode`] if it does not hold a tree.
    pub fn load_file(path: &Path) -> Result<Self, RuntimeError> {
        let bytes = std::fs::read(path).context(IoSnafu { path: path.display().to_string() })?;
        Self::from_bytes(&bytes)
    }

    /// Checks the structure of the tree and returns its depth.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Invalid`] if the table is empty, a child index
    /// does not point forward inside the table, a label or attribute is empty,
    /// a split tests the class attribute, a threshold is not finite, or the
    /// tree is deeper than `max_depth`.
    pub fn validate(&self, max_depth: usize) -> Result<usize, RuntimeError> {
        let invalid = |message: String| RuntimeError::Invalid { message };

        if self.class_attribute.is_empty() {
            return Err(invalid("class attribute is empty".to_string()));
        }
        if self.nodes.is_empty() {
            return Err(invalid("tree has no nodes".to_string()));
        }

        // depth[i] is the number of nodes on the path from the root to node i.
        let mut depth = vec![0usize; self.nodes.len()];
        depth[0] = 1;
        let mut deepest = 1;

        for (index, node) in self.nodes.iter().enumerate() {
            if depth[index] == 0 {
                return Err(invalid(format!("node {index} is unreachable")));
            }
            let children: Vec<u32> = match node {
                Node::Leaf { label } => {
                    if label.is_empty() {
                        return Err(invalid(format!("leaf {index} has an empty label")));
                    }
                    Vec::new()
                },
                Node::Threshold { attribute, threshold, below, above } => {
                    self.check_attribute(index, attribute)?;
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {index} threshold is not finite")));
                    }
                    vec![*below, *above]
                },
                Node::Category { attribute, branches, fallback } => {
                    self.check_attribute(index, attribute)?;
                    branches.iter().map(|(_, child)| *child).chain([*fallback]).collect()
                },
            };

            for child in children {
                let child = child as usize;
                if child <= index || child >= self.nodes.len() {
                    return Err(invalid(format!(
                        "node {index} points to {child}, outside {}..{}",
                        index + 1,
                        self.nodes.len()
                    )));
                }
                depth[child] = depth[child].max(depth[index] + 1);
                deepest = deepest.max(depth[child]);
            }
        }

        if deepest > max_depth {
            return Err(invalid(format!("depth {deepest} exceeds maximum {max_depth}")));
        }
        Ok(deepest)
    }

    fn check_attribute(&self, index: usize, attribute: &str) -> Result<(), RuntimeError> {
        if attribute.is_empty() {
            let message = format!("node {index} tests no attribute");
            return Err(RuntimeError::Invalid { message });
        }
        if attribute == self.class_attribute {
            return Err(RuntimeError::Invalid {
                message: format!("node {index} splits on the class attribute {attribute}"),
            });
        }
        Ok(())
    }

    /// Predicts one label per dataset row.
    ///
    /// The tree must have passed [`DecisionTree::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if a split attribute is absent from the
    /// dataset, a numeric split meets text, or a split meets a missing value.
    pub fn predict(&self, dataset: &Dataset) -> Result<Vec<String>, RuntimeError> {
        let columns: HashMap<&str, usize> =
            dataset.columns().iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();

        let mut predictions = Vec::with_capacity(dataset.rows().len());
        for (row_index, row) in dataset.rows().iter().enumerate() {
            let cell = |attribute: &str| lookup(&columns, row, row_index, attribute);

            let mut index = 0usize;
            let label = loop {
                let next = match self.nodes.get(index) {
                    Some(Node::Leaf { label }) => break label.clone(),
                    Some(Node::Threshold { attribute, threshold, below, above }) => {
                        let text = cell(attribute)?;
                        let value = text.parse::<f64>().map_err(|_| RuntimeError::NotNumeric {
                            attribute: attribute.clone(),
                            value: text.to_string(),
                        })?;
                        if value <= *threshold { *below } else { *above }
                    },
                    Some(Node::Category { attribute, branches, fallback }) => {
                        let text = cell(attribute)?;
                        branches
                            .iter()
                            .find(|(value, _)| value == text)
                            .map_or(*fallback, |(_, child)| *child)
                    },
                    None => {
                        return Err(RuntimeError::Invalid {
                            message: format!("node index {index} out of range"),
                        });
                    },
                };
                index = next as usize;
            };
            predictions.push(label);
        }
        Ok(predictions)
    }
}

fn lookup<'a>(
    columns: &HashMap<&str, usize>,
    row: &'a [Cell],
    row_index: usize,
    attribute: &str,
) -> Result<&'a str, RuntimeError> {
    let column = columns
        .get(attribute)
        .ok_or_else(|| RuntimeError::UnknownAttribute { attribute: attribute.to_string() })?;
    match row.get(*column) {
        Some(Cell::Value(text)) => Ok(text.as_str()),
        Some(Cell::Missing) | None => {
            Err(RuntimeError::MissingValue { attribute: attribute.to_string(), row: row_index })
        },
    }
}

fn flatten(authored: NodeSpec, nodes: &mut Vec<Node>) -> u32 {
    let index = nodes.len();
    // Placeholder keeps pre-order numbering; replaced once children are known.
    nodes.push(Node::Leaf { label: String::new() });
    let node = match authored {
        NodeSpec::Leaf(label) => Node::Leaf { label },
        NodeSpec::Threshold { attribute, threshold, below, above } => {
            let below = flatten(*below, nodes);
            let above = flatten(*above, nodes);
            Node::Threshold { attribute, threshold, below, above }
        },
        NodeSpec::Category { attribute, branches, fallback } => {
            let branches =
                branches.into_iter().map(|(value, child)| (value, flatten(child, nodes))).collect();
            let fallback = flatten(*fallback, nodes);
            Node::Category { attribute, branches, fallback }
        },
    };
    nodes[index] = node;
    index as u32
}
