//! Fuzz target for feature row parsing.
//!
//! `FeatureRow::parse` must never panic, and every row it accepts must encode
//! into a dataset the classifier runtime can parse: 22 columns, one row.

#![no_main]

use libfuzzer_sys::fuzz_target;

use sollytch_ledger_classifier::{Dataset, FEATURE_COUNT, FeatureRow};
use sollytch_ledger_types::Purpose;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(row) = FeatureRow::parse(text) else {
        return;
    };
    assert_eq!(row.values().len(), FEATURE_COUNT, "accepted row has wrong arity");

    for purpose in Purpose::ALL {
        let dataset = Dataset::parse(&row.encode(purpose)).expect("encoded row must parse");
        assert_eq!(dataset.columns().len(), FEATURE_COUNT + 1);
        assert_eq!(dataset.rows().len(), 1);
        assert_eq!(dataset.class_attribute(), purpose.key());
    }
});
