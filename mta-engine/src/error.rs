//! Error types for mta-engine
//!
//! Every handler failure becomes an [`ApiError`], rendered as
//! `{success:false, error, message, details?, timestamp}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mta_common::api::ErrorResponse;
use serde_json::{json, Value};
use thiserror::Error;

use crate::services::{CollaboratorError, PipelineError, PipelineFailure, RegistryError};
use crate::validators::ValidationError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation (400); nothing was done
    #[error("Invalid request data: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Pipeline run aborted (503 or 500 depending on the cause)
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Local task storage failure (500)
    #[error("Task storage error: {0}")]
    Storage(#[from] CollaboratorError),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(e) => match &e.failure {
                PipelineFailure::Categorizer(_) | PipelineFailure::Tracker(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineFailure::State(state) if state.is_lock_timeout() => StatusCode::SERVICE_UNAVAILABLE,
                PipelineFailure::State(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn parts(&self) -> (&'static str, String, Option<Value>) {
        match self {
            ApiError::Validation(e) => (
                "VALIDATION_ERROR",
                "Invalid request data".to_string(),
                Some(json!({ "field": e.field, "reason": e.reason.to_string(), "message": e.to_string() })),
            ),
            ApiError::BadRequest(msg) => ("BAD_REQUEST", msg.clone(), None),
            ApiError::NotFound(msg) => ("NOT_FOUND", msg.clone(), None),
            ApiError::Pipeline(e) => {
                let (code, message) = match &e.failure {
                    PipelineFailure::Categorizer(_) => ("AI_SERVICE_ERROR", "AI service unavailable"),
                    PipelineFailure::Tracker(_) => ("TRACKER_SERVICE_ERROR", "Task tracker unavailable"),
                    PipelineFailure::State(state) if state.is_lock_timeout() => {
                        ("LOCK_TIMEOUT", "State store is busy, retry later")
                    }
                    PipelineFailure::State(_) => ("STATE_IO_ERROR", "State store unavailable"),
                };
                let cause = match &e.failure {
                    PipelineFailure::Categorizer(inner) | PipelineFailure::Tracker(inner) => inner.to_string(),
                    PipelineFailure::State(inner) => inner.to_string(),
                };
                (
                    code,
                    message.to_string(),
                    Some(json!({
                        "cause": cause,
                        "meetingName": e.meeting_name,
                        "totalItems": e.total_items,
                        "skippedItems": e.skipped_items,
                    })),
                )
            }
            ApiError::Storage(e) => ("STORAGE_ERROR", e.to_string(), None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message, details) = self.parts();
        let body = match details {
            Some(details) => ErrorResponse::with_details(code, message, details),
            None => ErrorResponse::new(code, message),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
