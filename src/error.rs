//! Error types for feedhook.

use thiserror::Error;

use crate::store::DefinitionErrors;

/// Common error type for feedhook.
#[derive(Error, Debug)]
pub enum FeedhookError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Field-level validation errors raised while saving definitions.
    ///
    /// The save is rejected as a whole; nothing is persisted.
    #[error("invalid definitions: {0}")]
    Definitions(DefinitionErrors),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A newer request replaced this one before it completed.
    #[error("superseded: {0}")]
    Superseded(String),

    /// Background task failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// Article source error (feed fetch or parse).
    #[error("article source error: {0}")]
    ArticleSource(String),

    /// HTTP client error.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for feedhook operations.
pub type Result<T> = std::result::Result<T, FeedhookError>;
