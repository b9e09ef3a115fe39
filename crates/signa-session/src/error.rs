//! Session error types.

use thiserror::Error;

use signa_models::CatalogError;
use signa_store::StoreError;
use signa_vision::VisionError;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Session already running")]
    AlreadyRunning,

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// The classifier, model or label set is not loaded; `start()` refused.
    pub fn is_not_ready(&self) -> bool {
        match self {
            SessionError::NotReady(_) => true,
            SessionError::Vision(e) => e.is_not_ready(),
            _ => false,
        }
    }

    /// Should be shown to the user as a blocking notice; `start()` may be retried.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, SessionError::Vision(e) if e.is_camera_error())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Vision(e) => e.is_camera_error(),
            SessionError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_errors_are_user_facing() {
        let err: SessionError = VisionError::CameraPermissionDenied.into();
        assert!(err.is_user_facing());
        assert!(err.is_retryable());
        assert!(!err.is_not_ready());
    }

    #[test]
    fn test_not_ready_from_either_layer() {
        assert!(SessionError::not_ready("empty catalog").is_not_ready());
        let err: SessionError = VisionError::not_ready("model").into();
        assert!(err.is_not_ready());
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_catalog_error_converts() {
        let err: SessionError = CatalogError::Empty.into();
        assert!(matches!(err, SessionError::Catalog(_)));
        assert!(!err.is_retryable());
    }
}
