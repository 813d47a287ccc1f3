//! Invocation response envelope.
//!
//! Successful invocations carry a JSON (or plain text) payload. Failures carry
//! the error's display text verbatim plus structured details, so clients can
//! branch on the numeric code instead of matching message strings.

use serde::{Deserialize, Serialize};

use sollytch_ledger_types::ChaincodeError;

/// Status of a successful invocation.
pub const OK: u16 = 200;

/// Machine-readable error attributes attached to failed responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Numeric [`ErrorCode`](sollytch_ledger_types::ErrorCode).
    pub error_code: u16,
    /// Whether resubmitting may succeed.
    pub is_retryable: bool,
    /// Suggested recovery action.
    pub suggested_action: String,
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// 200 on success; 400, 404, 409, 422 or 500 on failure.
    pub status: u16,
    /// Empty on success, the error text otherwise.
    pub message: String,
    /// Result bytes; empty on failure.
    pub payload: Vec<u8>,
    /// Present on failure.
    pub details: Option<ErrorDetails>,
}

impl Response {
    /// A successful response carrying `payload`.
    pub fn success(payload: Vec<u8>) -> Self {
        Self { status: OK, message: String::new(), payload, details: None }
    }

    /// A failed response describing `err`.
    pub fn error(err: &ChaincodeError) -> Self {
        let code = err.code();
        Self {
            status: code.status(),
            message: err.to_string(),
            payload: Vec::new(),
            details: Some(ErrorDetails {
                error_code: code.as_u16(),
                is_retryable: code.is_retryable(),
                suggested_action: code.suggested_action().to_string(),
            }),
        }
    }

    /// Whether the invocation succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == OK
    }

    /// The payload as UTF-8 text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

impl From<Result<Vec<u8>, ChaincodeError>> for Response {
    fn from(result: Result<Vec<u8>, ChaincodeError>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(err) => Self::error(&err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use sollytch_ledger_types::{DocType, ErrorCode};

    use super::*;

    #[test]
    fn test_success() {
        let response = Response::success(b"true".to_vec());
        assert!(response.is_ok());
        assert_eq!(response.payload_str(), Some("true"));
        assert!(response.message.is_empty());
        assert!(response.details.is_none());
    }

    #[test]
    fn test_error_carries_display_text_and_code() {
        let err = ChaincodeError::NotFound { kind: DocType::Test, key: "T9".to_string() };
        let response = Response::error(&err);
        assert_eq!(response.status, 404);
        assert_eq!(response.message, err.to_string());
        assert!(response.payload.is_empty());

        let details = response.details.unwrap();
        assert_eq!(ErrorCode::from_u16(details.error_code), Some(ErrorCode::NotFound));
        assert!(!details.is_retryable);
    }

    #[test]
    fn test_from_result() {
        let err = ChaincodeError::SchemaMismatch { message: "3 fields".to_string() };
        assert_eq!(Response::from(Err(err)).status, 422);
        assert!(Response::from(Ok(Vec::new())).is_ok());
    }
}
