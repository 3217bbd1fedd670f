//! Common error types for CMT

use thiserror::Error;

/// Common result type for CMT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the CMT crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be decoded as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
