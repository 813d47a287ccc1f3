//! Fuzz target for classifier model decoding.
//!
//! Arbitrary bytes fed to `DecisionTree::from_bytes` must never panic. A tree
//! that decodes and validates must classify a feature row without panicking
//! and return one label per row.

#![no_main]

use libfuzzer_sys::fuzz_target;

use sollytch_ledger_classifier::{Dataset, DecisionTree};

const ROW: &str = "-23.55,-46.63,120,23.5,310,80,7.2,3.4,22,25.5,61,540,1.5,60,14,0.12,6,3.1,0.4,\
                   true,pass";

fuzz_target!(|data: &[u8]| {
    let Ok(tree) = DecisionTree::from_bytes(data) else {
        return;
    };
    if tree.validate(64).is_err() {
        return;
    }

    let header = sollytch_ledger_classifier::features::header();
    let text = format!("{header},{}\n{ROW},?\n", tree.class_attribute());
    let Ok(dataset) = Dataset::parse(&text) else {
        // The class attribute may collide with a feature column.
        return;
    };
    if let Ok(labels) = tree.predict(&dataset) {
        assert_eq!(labels.len(), 1, "one label per row");
        assert!(!labels[0].is_empty(), "validated trees have non-empty labels");
    }
});
