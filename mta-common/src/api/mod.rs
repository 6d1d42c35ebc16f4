//! Shared HTTP API types
//!
//! Framework-independent request/response envelopes. Each service wraps these
//! with its own axum `IntoResponse` implementations.

pub mod types;

pub use types::{ErrorResponse, SuccessEnvelope};
