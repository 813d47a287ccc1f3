//! Composite key encoding.
//!
//! Composite keys live in the same state namespace as simple keys but begin
//! with `U+0000`, so plain range scans can skip them.
//!
//! Key format: `\u{0}{object_type}\u{0}{attr_1}\u{0}...{attr_n}\u{0}`
//!
//! A partial-key scan covers `[prefix, prefix + U+10FFFF)`, where `prefix` is
//! the composite key built from the leading attributes.

use crate::stub::StubError;

/// First character of every composite key and separator between components.
pub const COMPOSITE_KEY_DELIMITER: char = '\u{0}';

/// Highest Unicode scalar value, used as the exclusive end of partial-key scans.
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

fn validate_component(component: &str) -> Result<(), StubError> {
    if component.contains([COMPOSITE_KEY_DELIMITER, MAX_UNICODE_RUNE]) {
        return Err(StubError::InvalidKey {
            key: component.to_string(),
            reason: "composite-key components must not contain U+0000 or U+10FFFF".to_string(),
        });
    }
    Ok(())
}

/// Builds a composite key from an object type and attribute segments.
///
/// # Errors
///
/// Returns [`StubError::InvalidKey`] if `object_type` is empty or any component
/// contains a reserved character.
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> Result<String, StubError> {
    if object_type.is_empty() {
        return Err(StubError::InvalidKey {
            key: String::new(),
            reason: "composite-key object type must not be empty".to_string(),
        });
    }
    validate_component(object_type)?;

    let capacity = 2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push(COMPOSITE_KEY_DELIMITER);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_DELIMITER);
    for attribute in attributes {
        validate_component(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_DELIMITER);
    }
    Ok(key)
}

/// Splits a composite key into its object type and attributes.
///
/// # Errors
///
/// Returns [`StubError::InvalidKey`] if `key` is not a well-formed composite key.
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), StubError> {
    let malformed = || StubError::InvalidKey {
        key: key.escape_debug().to_string(),
        reason: "not a composite key".to_string(),
    };

    let body = key
        .strip_prefix(COMPOSITE_KEY_DELIMITER)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_DELIMITER))
        .ok_or_else(malformed)?;

    let mut components = body.split(COMPOSITE_KEY_DELIMITER).map(str::to_string);
    let object_type = components.next().filter(|t| !t.is_empty()).ok_or_else(malformed)?;
    Ok((object_type, components.collect()))
}

/// Returns the half-open key range covering every composite key under
/// `object_type` whose leading attributes equal `attributes`.
///
/// # Errors
///
/// Returns [`StubError::InvalidKey`] for malformed components.
pub fn partial_key_range(
    object_type: &str,
    attributes: &[&str],
) -> Result<(String, String), StubError> {
    let start = create_composite_key(object_type, attributes)?;
    let mut end = start.clone();
    end.push(MAX_UNICODE_RUNE);
    Ok((start, end))
}

/// Whether `key` belongs to the composite-key namespace.
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_DELIMITER)
}
