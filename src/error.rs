//! Error types for the Slate language server

use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, SlateError>;

/// Slate language server error types
#[derive(Error, Debug)]
pub enum SlateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
