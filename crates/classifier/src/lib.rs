//! Classifier runtime and classification pipeline for the Sollytch custody
//! chaincode.
//!
//! Classifiers are decision trees stored as ledger state, one per
//! [`Purpose`](sollytch_ledger_types::Purpose). This crate provides:
//!
//! - The decision-tree runtime and the textual dataset it evaluates
//! - The model repository: versioned storage, staged loading and an optional cache
//! - The canonical 21-column feature encoder
//! - The all-or-nothing classification pipeline

#![deny(unsafe_code)]

pub mod cache;
pub mod dataset;
pub mod features;
mod pipeline;
mod repository;
pub mod staging;
pub mod tree;

pub use cache::ClassifierCache;
pub use dataset::{Cell, Dataset, DatasetError};
pub use features::{FEATURE_COLUMNS, FEATURE_COUNT, FLAG_FALSE, FLAG_TRUE, FeatureRow};
pub use pipeline::ClassificationPipeline;
pub use repository::{LoadedClassifier, ModelRepository, parse_purpose};
pub use tree::{DecisionTree, Node, NodeSpec, RuntimeError};
