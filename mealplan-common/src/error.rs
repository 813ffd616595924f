//! Common error types for the meal planner

use thiserror::Error;

/// Common result type for meal planner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the meal planner crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No session could be established; terminal for the session
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Backend rejected the operation (e.g. permission denied, unavailable)
    #[error("Store error: {0}")]
    Store(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
