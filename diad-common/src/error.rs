//! Common error types for DIAD

use thiserror::Error;

/// Common result type for DIAD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the notation, generator and config layers
#[derive(Error, Debug)]
pub enum Error {
    /// Interval id outside the 0..=12 table
    #[error("Invalid interval id: {0}")]
    InvalidIntervalId(i32),

    /// Generator was asked to pick from an empty id list
    #[error("No interval ids to choose from")]
    EmptyIntervalSet,

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
