//! Fuzz target for composite key encoding.
//!
//! `split_composite_key` must never panic on arbitrary strings, and any key
//! built by `create_composite_key` must split back into its parts.

#![no_main]

use libfuzzer_sys::fuzz_target;

use sollytch_ledger_state::keys::{create_composite_key, is_composite_key, split_composite_key};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = split_composite_key(text);

    let mut parts = text.split('|');
    let object_type = parts.next().unwrap_or_default();
    let attributes: Vec<&str> = parts.collect();

    if let Ok(key) = create_composite_key(object_type, &attributes) {
        assert!(is_composite_key(&key), "created key is not composite");
        let (split_type, split_attributes) =
            split_composite_key(&key).expect("created key must split");
        assert_eq!(split_type, object_type, "object type mismatch");
        assert_eq!(split_attributes, attributes, "attribute mismatch");
    }
});
