//! Input validation for invocation arguments.
//!
//! Runs before any state is read or written, so a rejected request never
//! touches the ledger.
//!
//! ## Identifier rules
//!
//! Identifiers become state keys and composite-key segments. They must be
//! non-empty, fit in `max_key_bytes`, and must not contain `U+0000` or
//! `U+10FFFF`, which the platform reserves as composite-key delimiters.

use std::fmt;

use crate::config::ValidationConfig;

/// Characters reserved by the composite-key encoding.
pub const RESERVED_KEY_CHARS: [char; 2] = ['\u{0}', '\u{10FFFF}'];

/// Validation error with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

fn violation(field: &str, constraint: impl Into<String>) -> ValidationError {
    ValidationError { field: field.to_string(), constraint: constraint.into() }
}

/// Validates an identifier used as a state key or composite-key segment.
///
/// # Errors
///
/// Returns [`ValidationError`] if the identifier is empty, exceeds
/// `max_key_bytes`, or contains a reserved delimiter character.
pub fn validate_identifier(
    field: &str,
    value: &str,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(violation(field, "must not be empty"));
    }
    if value.len() > config.max_key_bytes {
        return Err(violation(
            field,
            format!("length {} bytes exceeds maximum {} bytes", value.len(), config.max_key_bytes),
        ));
    }
    if let Some(pos) = value.find(&RESERVED_KEY_CHARS[..]) {
        return Err(violation(
            field,
            format!("contains a reserved composite-key delimiter at byte offset {pos}"),
        ));
    }
    Ok(())
}

/// Validates a JSON record payload's size.
///
/// # Errors
///
/// Returns [`ValidationError`] if the payload is blank or exceeds `max_payload_bytes`.
pub fn validate_payload(
    field: &str,
    payload: &str,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if payload.trim().is_empty() {
        return Err(violation(field, "must not be empty"));
    }
    if payload.len() > config.max_payload_bytes {
        return Err(violation(
            field,
            format!(
                "length {} bytes exceeds maximum {} bytes",
                payload.len(),
                config.max_payload_bytes
            ),
        ));
    }
    Ok(())
}

/// Validates an encoded classifier payload's size.
///
/// The payload stays opaque until it is loaded for inference.
///
/// # Errors
///
/// Returns [`ValidationError`] if the payload is empty or exceeds `max_model_payload_bytes`.
pub fn validate_model_payload(
    payload: &str,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if payload.is_empty() {
        return Err(violation("model_data", "must not be empty"));
    }
    if payload.len() > config.max_model_payload_bytes {
        return Err(violation(
            "model_data",
            format!(
                "length {} bytes exceeds maximum {} bytes",
                payload.len(),
                config.max_model_payload_bytes
            ),
        ));
    }
    Ok(())
}

/// Validates a hex-encoded content hash and returns it lowercased.
///
/// # Errors
///
/// Returns [`ValidationError`] if the hash is empty, has odd length, exceeds
/// `max_hash_hex_chars`, or contains non-hex characters.
pub fn validate_hash_hex(hash: &str, config: &ValidationConfig) -> Result<String, ValidationError> {
    if hash.is_empty() {
        return Err(violation("hash", "must not be empty"));
    }
    if hash.len() > config.max_hash_hex_chars {
        return Err(violation(
            "hash",
            format!(
                "length {} exceeds maximum {} hex characters",
                hash.len(),
                config.max_hash_hex_chars
            ),
        ));
    }
    if hash.len() % 2 != 0 {
        return Err(violation("hash", "must have an even number of hex characters"));
    }
    if let Some(pos) = hash.find(|c: char| !c.is_ascii_hexdigit()) {
        return Err(violation("hash", format!("non-hex character at byte offset {pos}")));
    }
    Ok(hash.to_ascii_lowercase())
}
