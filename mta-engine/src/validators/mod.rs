//! Ingress validation
//!
//! 1. **sanitize** - text normalization with length bounds
//! 2. **webhook_request** - whole-request validation into a [`WebhookRequest`](crate::models::WebhookRequest)

pub mod sanitize;
pub mod webhook_request;

pub use sanitize::{normalize_text, sanitize, SanitizeError};
pub use webhook_request::{
    parse_webhook_body, sanitize_action_item, validate_request, ValidationError, ValidationReason, ACTION_ITEM_MAX_LEN,
    ACTION_ITEM_MIN_LEN, MAX_ACTION_ITEMS, MEETING_NAME_MAX_LEN,
};
