//! Error types for camera and classifier operations.

use thiserror::Error;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Result type for a single classifier call.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Errors that can occur while starting or running the detection loop.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Camera permission denied")]
    CameraPermissionDenied,

    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Classifier not ready: {0}")]
    ClassifierNotReady(String),

    #[error("Detection loop already running")]
    AlreadyRunning,

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl VisionError {
    /// Create a camera-unavailable error.
    pub fn camera_unavailable(message: impl Into<String>) -> Self {
        Self::CameraUnavailable(message.into())
    }

    /// Create a classifier-not-ready error.
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::ClassifierNotReady(message.into())
    }

    /// Camera acquisition failed; the user can fix it and retry `start()`.
    pub fn is_camera_error(&self) -> bool {
        matches!(
            self,
            VisionError::CameraPermissionDenied | VisionError::CameraUnavailable(_)
        )
    }

    /// The model or label set was not loaded before `start()`.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, VisionError::ClassifierNotReady(_))
    }
}

/// Errors from one classifier invocation.
///
/// These abort the current tick only; the loop keeps running.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Unsupported running mode: {0}")]
    UnsupportedMode(String),
}

impl ClassifierError {
    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::InferenceFailed(message.into())
    }

    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame(message.into())
    }
}
