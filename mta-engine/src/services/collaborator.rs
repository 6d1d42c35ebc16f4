//! Errors shared by the categorizer and tracker collaborators

use thiserror::Error;

/// Failure of a whole collaborator batch
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Credentials rejected or missing
    #[error("Invalid or missing API credentials: {0}")]
    Auth(String),

    /// Quota exhausted or rate limited
    #[error("Quota exceeded or rate limit reached: {0}")]
    RateLimited(String),

    /// Timeout, DNS or connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// Batch rejected before any external call
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// Response did not have the agreed shape
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// Provider returned an error status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CollaboratorError {
    /// Classify a transport-level reqwest failure.
    ///
    /// The request URL is stripped from the message; it may carry credentials.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            CollaboratorError::Network(format!("request timed out: {}", err))
        } else if err.is_connect() {
            CollaboratorError::Network(format!("connection failed: {}", err))
        } else if err.is_decode() {
            CollaboratorError::InvalidResponse(err.to_string())
        } else {
            CollaboratorError::Network(err.to_string())
        }
    }
}
