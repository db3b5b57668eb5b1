//! Error types for the roster ecosystem.

use thiserror::Error;

/// Errors that can occur in roster operations.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for roster operations.
pub type RosterResult<T> = Result<T, RosterError>;
