//! Uniform error shape shared by the HTTP client, the SSE listener and the
//! feature layer.
//!
//! Every failure that reaches feature code is an [`ApiError`]. Feature code
//! only ever branches on [`ApiError::status`] and [`ApiError::error_code`];
//! transport exceptions are converted at the boundary where they happen.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Error codes with dedicated client handling.
pub mod codes {
    /// Access token expired; recoverable through a token reissue.
    pub const EXPIRED_ACCESS_TOKEN: &str = "AUTH_40103";
    /// No access token was presented at all.
    pub const NO_TOKEN: &str = "AUTH_40101";
    /// GitHub rejected the user's GitHub credentials.
    pub const GITHUB_UNAUTHORIZED: &str = "GITHUB_40101";
    /// The repository has no sections yet; triggers section initialization.
    pub const NOT_FOUND_SECTIONS: &str = "SECTION_40401";
    /// Synthesized when an error body could not be decoded.
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

    pub const TASK_ID_MISSING: &str = "CLIENT_TASK_ID_MISSING";
    pub const TASK_NOT_STARTED: &str = "CLIENT_TASK_NOT_STARTED";
    pub const LAST_SECTION: &str = "CLIENT_LAST_SECTION";
    pub const INVALID_REQUEST: &str = "CLIENT_INVALID_REQUEST";
    pub const DECODE: &str = "CLIENT_DECODE";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status: u16,
    pub error_code: String,
    pub error: String,
    pub code: String,
    pub message: String,
}

/// Lenient view of an error body; only `errorCode` is mandatory.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status: Option<u16>,
    error_code: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn into_api_error(self, fallback_status: u16) -> ApiError {
        let code = self.code.unwrap_or_else(|| self.error_code.clone());
        ApiError {
            status: self.status.unwrap_or(fallback_status),
            error: self.error.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            error_code: self.error_code,
            code,
        }
    }
}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

impl ApiError {
    /// Builds an error from a non-2xx response body.
    ///
    /// Falls back to a status 500 `UNKNOWN_ERROR` when the body is not a
    /// structured error payload. The message keeps the HTTP status.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => parsed.into_api_error(status),
            Err(_) => Self::unknown(500, format!("HTTP error! status: {status}")),
        }
    }

    /// Builds an error from the data of an `<event>-error` SSE frame.
    pub fn from_event_payload(data: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(data) {
            Ok(parsed) => parsed.into_api_error(500),
            Err(_) => {
                let trimmed = data.trim();
                let message = if trimmed.is_empty() {
                    "Task failed without details".to_string()
                } else {
                    trimmed.to_string()
                };
                Self::unknown(500, message)
            }
        }
    }

    /// A request that never produced a response (connection refused, reset, ...).
    pub fn transport(detail: impl fmt::Display) -> Self {
        Self::unknown(500, detail.to_string())
    }

    pub fn unknown(status: u16, message: impl Into<String>) -> Self {
        ApiError {
            status,
            error_code: codes::UNKNOWN_ERROR.to_string(),
            error: reason_phrase(status),
            code: "UNKNOWN".to_string(),
            message: message.into(),
        }
    }

    /// A user-actionable failure detected before any request was sent.
    pub fn client(error_code: &str, message: impl Into<String>) -> Self {
        ApiError {
            status: 400,
            error_code: error_code.to_string(),
            error: reason_phrase(400),
            code: error_code.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(detail: impl fmt::Display) -> Self {
        ApiError {
            status: 500,
            error_code: codes::DECODE.to_string(),
            error: reason_phrase(500),
            code: codes::DECODE.to_string(),
            message: format!("Failed to decode response: {detail}"),
        }
    }

    pub fn task_id_missing() -> Self {
        Self::client(
            codes::TASK_ID_MISSING,
            "Operation failed: no task id was recorded for this request.",
        )
    }

    pub fn has_code(&self, error_code: &str) -> bool {
        self.error_code == error_code
    }

    /// True when a token reissue may recover the request.
    ///
    /// Missing-token and GitHub-unauthorized failures are never refreshable.
    pub fn is_refreshable(&self) -> bool {
        match self.error_code.as_str() {
            codes::EXPIRED_ACCESS_TOKEN => true,
            codes::NO_TOKEN | codes::GITHUB_UNAUTHORIZED => false,
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_not_found_sections(&self) -> bool {
        self.has_code(codes::NOT_FOUND_SECTIONS)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{} ({})", self.error, self.error_code)
        } else {
            write!(f, "{} ({}, {})", self.message, self.status, self.error_code)
        }
    }
}

impl Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_structured_error_body() {
        let body = br#"{"status":401,"errorCode":"AUTH_40103","error":"Unauthorized","code":"AUTH_40103","message":"expired"}"#;
        let error = ApiError::from_response(401, body);
        assert_eq!(error.status, 401);
        assert!(error.is_refreshable());
        assert_eq!(error.message, "expired");
    }

    #[test]
    fn missing_status_uses_http_status() {
        let error = ApiError::from_response(404, br#"{"errorCode":"SECTION_40401"}"#);
        assert_eq!(error.status, 404);
        assert!(error.is_not_found_sections());
        assert_eq!(error.code, "SECTION_40401");
    }

    #[test]
    fn undecodable_body_becomes_unknown_error() {
        let error = ApiError::from_response(502, b"<html>bad gateway</html>");
        assert_eq!(error.status, 500);
        assert_eq!(error.error_code, codes::UNKNOWN_ERROR);
        assert_eq!(error.error, "Internal Server Error");
        assert_eq!(error.message, "HTTP error! status: 502");
    }

    #[test]
    fn unstructured_401_is_not_treated_as_unauthorized() {
        let error = ApiError::from_response(401, b"<html>nope</html>");
        assert_eq!(error.status, 500);
        assert_eq!(error.error_code, codes::UNKNOWN_ERROR);
        assert!(!error.is_unauthorized());
    }

    #[test]
    fn transport_failures_are_status_500() {
        let error = ApiError::transport("connection refused");
        assert_eq!(error.status, 500);
        assert_eq!(error.error_code, codes::UNKNOWN_ERROR);
    }

    #[test]
    fn non_recoverable_auth_codes_are_not_refreshable() {
        for code in [codes::NO_TOKEN, codes::GITHUB_UNAUTHORIZED] {
            let body = format!(r#"{{"status":401,"errorCode":"{code}"}}"#);
            let error = ApiError::from_response(401, body.as_bytes());
            assert!(!error.is_refreshable());
            assert!(error.is_unauthorized());
        }
    }

    #[test]
    fn event_payload_without_structure_keeps_text() {
        let error = ApiError::from_event_payload("worker crashed");
        assert_eq!(error.message, "worker crashed");
        assert_eq!(error.status, 500);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let error = ApiError::client(codes::LAST_SECTION, "keep one");
        let value = serde_json::to_value(&error).expect("serialize");
        assert_eq!(value["errorCode"], "CLIENT_LAST_SECTION");
        assert_eq!(value["status"], 400);
    }
}
