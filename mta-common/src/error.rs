//! Common error types for MTA

use thiserror::Error;

/// Common result type for MTA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across MTA services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
