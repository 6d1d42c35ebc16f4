//! Shared API request/response types
//!
//! Every MTA response carries a `success` flag and an RFC 3339 `timestamp`.
//! Successful payloads are flattened into [`SuccessEnvelope`]; failures use
//! [`ErrorResponse`].

use serde::Serialize;
use serde_json::Value;

use crate::time::now_rfc3339;

// ========================================
// Error Response Types
// ========================================

/// Error response body
///
/// # Examples
///
/// ```
/// use mta_common::api::types::ErrorResponse;
///
/// let error = ErrorResponse::new("VALIDATION_ERROR", "Invalid request data");
/// assert!(!error.success);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Error type identifier (e.g. `VALIDATION_ERROR`)
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// When the error was produced
    pub timestamp: String,
}

impl ErrorResponse {
    /// Create new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
            details: None,
            timestamp: now_rfc3339(),
        }
    }

    /// Create error response with details
    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(error, message)
        }
    }
}

// ========================================
// Success Response Types
// ========================================

/// Success envelope: `{ "success": true, "timestamp": ..., ...data }`
#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope<T: Serialize> {
    pub success: bool,
    pub timestamp: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            timestamp: now_rfc3339(),
            data,
        }
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_without_details() {
        let error = ErrorResponse::new("LOCK_TIMEOUT", "State is busy");

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "LOCK_TIMEOUT");
        assert_eq!(json["message"], "State is busy");
        assert!(json.get("details").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_error_response_with_details() {
        let details = serde_json::json!({ "field": "meetingName" });
        let error = ErrorResponse::with_details("VALIDATION_ERROR", "Invalid request data", details);

        assert_eq!(error.error, "VALIDATION_ERROR");
        assert_eq!(error.details.unwrap()["field"], "meetingName");
    }

    #[test]
    fn test_success_envelope_flattens_payload() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            total_items: usize,
        }

        let json = serde_json::to_value(SuccessEnvelope::new(Payload { total_items: 4 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["totalItems"], 4);
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
