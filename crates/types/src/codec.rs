//! Centralized serialization and deserialization functions.
//!
//! Two encodings live side by side:
//! - JSON for ledger documents and responses (self-describing, read by clients)
//! - postcard for the binary classifier artifact carried inside a model payload
//!
//! Model payloads travel as base64 text; helpers for that are here too.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, de::DeserializeOwned};
use snafu::Snafu;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Binary encoding failed.
    #[snafu(display("Encoding failed: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Binary decoding failed.
    #[snafu(display("Decoding failed: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// JSON encoding or decoding failed.
    #[snafu(display("JSON error: {source}"))]
    Json {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Base64 text could not be decoded.
    #[snafu(display("Base64 decoding failed: {source}"))]
    Base64 {
        /// The underlying base64 error.
        source: base64::DecodeError,
    },
}

/// Encodes a value to bytes using postcard serialization.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(value).map_err(|source| CodecError::Encode { source })
}

/// Decodes bytes to a value using postcard deserialization.
///
/// # Errors
///
/// Returns `CodecError::Decode` if deserialization fails.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    postcard::from_bytes(bytes).map_err(|source| CodecError::Decode { source })
}

/// Encodes a value as compact JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Json` if serialization fails.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|source| CodecError::Json { source })
}

/// Decodes JSON bytes to a value.
///
/// # Errors
///
/// Returns `CodecError::Json` if the bytes are not valid JSON for `T`.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|source| CodecError::Json { source })
}

/// Encodes bytes as standard padded base64 text.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard padded base64 text.
///
/// # Errors
///
/// Returns `CodecError::Base64` if the text is not valid base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD.decode(text.trim()).map_err(|source| CodecError::Base64 { source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ComplexStruct {
        id: u64,
        name: String,
        data: Vec<u8>,
        nested: Option<NestedStruct>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NestedStruct {
        value: i32,
        flag: bool,
    }

    fn sample() -> ComplexStruct {
        ComplexStruct {
            id: 12345,
            name: "test entity".to_string(),
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            nested: Some(NestedStruct { value: -42, flag: true }),
        }
    }

    #[test]
    fn test_roundtrip_complex_struct() {
        let original = sample();
        let bytes = encode(&original).expect("encode complex struct");
        let decoded: ComplexStruct = decode(&bytes).expect("decode complex struct");
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_decode_malformed_input() {
        let result: Result<ComplexStruct, _> = decode(&[0xFF, 0xFF, 0xFF, 0xFF]);
        let err = result.unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
        assert!(err.to_string().starts_with("Decoding failed:"));
    }

    #[test]
    fn test_decode_truncated_data() {
        let bytes = encode(&sample()).expect("encode");
        let truncated = &bytes[..2.min(bytes.len())];
        let result: Result<ComplexStruct, _> = decode(truncated);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_input() {
        let result: Result<u64, _> = decode(&[]);
        assert!(matches!(result.unwrap_err(), CodecError::Decode { .. }));
    }

    #[test]
    fn test_json_document_roundtrip() {
        let original = sample();
        let bytes = encode_json(&original).expect("encode json");
        assert!(bytes.starts_with(b"{\"id\":12345"));
        let decoded: ComplexStruct = decode_json(&bytes).expect("decode json");
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_json_rejects_non_json() {
        let err = decode_json::<ComplexStruct>(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Json { .. }));
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_base64_roundtrip_and_whitespace() {
        let text = encode_base64(b"\x00\x01model bytes");
        assert_eq!(decode_base64(&text).unwrap(), b"\x00\x01model bytes");
        assert_eq!(decode_base64(&format!("  {text}\n")).unwrap(), b"\x00\x01model bytes");
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let err = decode_base64("not*base64!").unwrap_err();
        assert!(matches!(err, CodecError::Base64 { .. }));
    }

    #[test]
    fn test_codec_error_source_chain() {
        use std::error::Error;

        let err = decode::<String>(&[0xFF]).unwrap_err();
        assert!(err.source().is_some(), "CodecError should have a source");
    }
}
