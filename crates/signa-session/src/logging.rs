//! Structured session logging utilities.

use tracing::{error, info, warn};

use signa_models::SessionId;

/// Session logger with consistent contextual fields.
///
/// Every line carries the session ID and the operation being performed.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: String,
}

impl SessionLogger {
    /// Create a logger for a session and operation (e.g. "practice").
    pub fn new(session_id: &SessionId, operation: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}
