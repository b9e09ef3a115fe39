//! Session configuration.

use std::path::PathBuf;
use std::time::Duration;

use signa_models::LabelCatalog;
use signa_vision::LoopConfig;

use crate::error::{SessionError, SessionResult};

/// Practice session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Detection loop timing
    pub detection: LoopConfig,
    /// Confident matches in a row needed to complete a target
    pub required_correct: u32,
    /// Samples at or below this confidence are inconclusive
    pub confidence_threshold: f32,
    /// Pause between "target completed" and the next target
    pub settle_delay: Duration,
    /// Period of automatic target rotation, when enabled
    pub auto_rotate: Duration,
    /// Number of ranked signs kept in a summary
    pub top_signs: usize,
    /// Optional `labels.json`; the LSP alphabet is used otherwise
    pub catalog_path: Option<PathBuf>,
    /// Capacity of the session update channel
    pub update_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detection: LoopConfig::default(),
            required_correct: 5,
            confidence_threshold: 0.6,
            settle_delay: Duration::from_millis(1000),
            auto_rotate: Duration::from_secs(5),
            top_signs: 5,
            catalog_path: None,
            update_buffer: 256,
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            detection: LoopConfig::from_env(),
            required_correct: std::env::var("SIGNA_REQUIRED_CORRECT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(5),
            confidence_threshold: std::env::var("SIGNA_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|t: &f32| (0.0..=1.0).contains(t))
                .unwrap_or(0.6),
            settle_delay: Duration::from_millis(
                std::env::var("SIGNA_SETTLE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            auto_rotate: Duration::from_secs(
                std::env::var("SIGNA_AUTO_ROTATE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|s: &u64| *s > 0)
                    .unwrap_or(5),
            ),
            top_signs: std::env::var("SIGNA_TOP_SIGNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(5),
            catalog_path: std::env::var("SIGNA_CATALOG_PATH").ok().map(PathBuf::from),
            update_buffer: 256,
        }
    }

    /// Reject settings the session cannot run with.
    pub fn validate(&self) -> SessionResult<()> {
        if self.required_correct == 0 {
            return Err(SessionError::config_error("required_correct must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(SessionError::config_error(format!(
                "confidence_threshold {} is outside [0, 1]",
                self.confidence_threshold
            )));
        }
        if self.top_signs == 0 {
            return Err(SessionError::config_error("top_signs must be at least 1"));
        }
        let detection = &self.detection;
        if detection.tick_interval.is_zero()
            || detection.classify_timeout.is_zero()
            || detection.stop_grace.is_zero()
        {
            return Err(SessionError::config_error("detection durations must be non-zero"));
        }
        if self.auto_rotate.is_zero() {
            return Err(SessionError::config_error("auto_rotate period must be non-zero"));
        }
        Ok(())
    }

    /// Load the configured label catalog.
    pub fn load_catalog(&self) -> SessionResult<LabelCatalog> {
        match &self.catalog_path {
            Some(path) => Ok(LabelCatalog::load(path)?),
            None => Ok(LabelCatalog::lsp_alphabet()),
        }
    }
}

/// Settings used only by the `signa-session` binary.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Replay script for the demo classifier
    pub replay_script: Option<PathBuf>,
    /// How long the demo session runs
    pub session_length: Duration,
    /// JSON Lines file receiving summaries
    pub store_path: PathBuf,
    /// Key for persisted summaries
    pub user_id: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            replay_script: None,
            session_length: Duration::from_secs(10),
            store_path: PathBuf::from("sessions.jsonl"),
            user_id: "local".to_string(),
        }
    }
}

impl RunnerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            replay_script: std::env::var("SIGNA_REPLAY_SCRIPT").ok().map(PathBuf::from),
            session_length: Duration::from_secs(
                std::env::var("SIGNA_SESSION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            store_path: std::env::var("SIGNA_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("sessions.jsonl")),
            user_id: std::env::var("SIGNA_USER_ID").unwrap_or_else(|_| "local".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.required_correct, 5);
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.settle_delay, Duration::from_secs(1));
        assert_eq!(config.top_signs, 5);
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        assert!(SessionConfig::default().validate().is_ok());

        let cases = [
            SessionConfig {
                required_correct: 0,
                ..SessionConfig::default()
            },
            SessionConfig {
                confidence_threshold: f32::NAN,
                ..SessionConfig::default()
            },
            SessionConfig {
                confidence_threshold: 1.5,
                ..SessionConfig::default()
            },
            SessionConfig {
                top_signs: 0,
                ..SessionConfig::default()
            },
            SessionConfig {
                detection: LoopConfig {
                    stop_grace: Duration::ZERO,
                    ..LoopConfig::default()
                },
                ..SessionConfig::default()
            },
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, SessionError::ConfigError(_)), "{:?}", config);
        }
    }

    #[test]
    fn test_default_catalog_is_alphabet() {
        let catalog = SessionConfig::default().load_catalog().unwrap();
        assert_eq!(catalog.len(), 27);
    }

    #[test]
    fn test_catalog_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"{"labels": ["A", "B", "A", ""]}"#).unwrap();

        let config = SessionConfig {
            catalog_path: Some(path),
            ..SessionConfig::default()
        };
        assert_eq!(config.load_catalog().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_catalog_file_fails() {
        let config = SessionConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/labels.json")),
            ..SessionConfig::default()
        };
        assert!(config.load_catalog().is_err());
    }
}
