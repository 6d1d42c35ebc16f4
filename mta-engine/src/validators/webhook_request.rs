//! Webhook request validation
//!
//! Runs before any persistence or network side effect. The first violation
//! rejects the whole request with a field-scoped [`ValidationError`].

use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use super::sanitize::{sanitize, SanitizeError};
use crate::models::WebhookRequest;

pub const MEETING_NAME_MAX_LEN: usize = 200;
pub const ACTION_ITEM_MAX_LEN: usize = 500;
pub const ACTION_ITEM_MIN_LEN: usize = 3;
pub const MAX_ACTION_ITEMS: usize = 50;

/// Why a field was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("is required")]
    Missing,

    #[error("must be {expected}")]
    WrongType { expected: &'static str },

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("array cannot be empty")]
    EmptyList,

    #[error("maximum {max} action items allowed per request")]
    TooManyItems { max: usize },

    #[error("duplicate action items are not allowed")]
    DuplicateItems,
}

/// Field-scoped validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// JSON path of the offending field, e.g. `actionItems[2]`
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<ValidationReason>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Parse and validate a raw request body
pub fn parse_webhook_body(body: &[u8]) -> Result<WebhookRequest, ValidationError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ValidationError::new("body", ValidationReason::MalformedJson(e.to_string())))?;
    validate_request(&value)
}

/// Validate a decoded request body into a normalized [`WebhookRequest`]
pub fn validate_request(body: &Value) -> Result<WebhookRequest, ValidationError> {
    let object = body
        .as_object()
        .ok_or_else(|| ValidationError::new("body", ValidationReason::WrongType { expected: "a JSON object" }))?;

    let meeting_name = match object.get("meetingName") {
        None | Some(Value::Null) => return Err(ValidationError::new("meetingName", ValidationReason::Missing)),
        Some(Value::String(s)) => {
            sanitize(s, MEETING_NAME_MAX_LEN).map_err(|e| ValidationError::new("meetingName", e))?
        }
        Some(_) => {
            return Err(ValidationError::new(
                "meetingName",
                ValidationReason::WrongType { expected: "a string" },
            ))
        }
    };

    let items = match object.get("actionItems") {
        None | Some(Value::Null) => return Err(ValidationError::new("actionItems", ValidationReason::Missing)),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ValidationError::new(
                "actionItems",
                ValidationReason::WrongType { expected: "an array" },
            ))
        }
    };

    if items.is_empty() {
        return Err(ValidationError::new("actionItems", ValidationReason::EmptyList));
    }
    if items.len() > MAX_ACTION_ITEMS {
        return Err(ValidationError::new(
            "actionItems",
            ValidationReason::TooManyItems { max: MAX_ACTION_ITEMS },
        ));
    }

    let mut action_items = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        action_items.push(validate_action_item(index, item)?);
    }

    let mut seen = HashSet::with_capacity(action_items.len());
    if !action_items.iter().all(|item| seen.insert(item.as_str())) {
        return Err(ValidationError::new("actionItems", ValidationReason::DuplicateItems));
    }

    Ok(WebhookRequest {
        meeting_name,
        action_items,
    })
}

fn validate_action_item(index: usize, item: &Value) -> Result<String, ValidationError> {
    let field = format!("actionItems[{}]", index);
    let text = item
        .as_str()
        .ok_or_else(|| ValidationError::new(field.as_str(), ValidationReason::WrongType { expected: "a string" }))?;

    sanitize_action_item(text).map_err(|reason| ValidationError::new(field, reason))
}

/// Sanitize one action item and apply its length bounds
pub fn sanitize_action_item(text: &str) -> Result<String, ValidationReason> {
    let sanitized = sanitize(text, ACTION_ITEM_MAX_LEN)?;
    if sanitized.chars().count() < ACTION_ITEM_MIN_LEN {
        return Err(ValidationReason::TooShort { min: ACTION_ITEM_MIN_LEN });
    }
    Ok(sanitized)
}
