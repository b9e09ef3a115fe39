//! Summary store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while persisting or reading summaries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid user id: {0}")]
    InvalidUser(String),

    #[error("Corrupt record at line {line}: {message}")]
    CorruptRecord { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn invalid_user(user_id: impl Into<String>) -> Self {
        Self::InvalidUser(user_id.into())
    }

    /// Check if a later attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}
