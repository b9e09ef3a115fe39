//! Practice mode definitions and the practice state snapshot.
//!
//! - `Validation`: the system shows a target label and scores attempts
//! - `Manual`: free browsing of labels, no scoring

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::Label;

/// Practice mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PracticeMode {
    /// A target label is assigned and the user must reproduce it.
    #[default]
    Validation,

    /// The user browses labels freely; nothing is scored.
    Manual,
}

impl PracticeMode {
    /// All available practice modes.
    pub const ALL: &'static [PracticeMode] = &[PracticeMode::Validation, PracticeMode::Manual];

    /// Returns the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeMode::Validation => "validation",
            PracticeMode::Manual => "manual",
        }
    }

    /// The other mode.
    pub fn toggled(&self) -> Self {
        match self {
            PracticeMode::Validation => PracticeMode::Manual,
            PracticeMode::Manual => PracticeMode::Validation,
        }
    }

    /// Whether events are scored against the target in this mode.
    pub fn is_scored(&self) -> bool {
        matches!(self, PracticeMode::Validation)
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown practice mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown practice mode: {0}")]
pub struct PracticeModeParseError(pub String);

impl FromStr for PracticeMode {
    type Err = PracticeModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "validation" | "validate" => Ok(PracticeMode::Validation),
            "manual" => Ok(PracticeMode::Manual),
            other => Err(PracticeModeParseError(other.to_string())),
        }
    }
}

/// Read-only snapshot of the practice state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PracticeState {
    pub mode: PracticeMode,
    pub target_label: Option<Label>,
    /// Confident, correct events in a row; never exceeds `required_correct`.
    pub consecutive_correct: u32,
    pub required_correct: u32,
    pub confidence_threshold: f32,
    /// True between "target completed" and the next target.
    pub settling: bool,
}

impl PracticeState {
    /// Fraction of the required run achieved so far, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.required_correct == 0 {
            return 0.0;
        }
        (self.consecutive_correct as f32 / self.required_correct as f32).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_toggle() {
        assert_eq!(PracticeMode::Validation.toggled(), PracticeMode::Manual);
        assert_eq!(PracticeMode::Manual.toggled(), PracticeMode::Validation);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Manual".parse::<PracticeMode>().unwrap(), PracticeMode::Manual);
        assert_eq!(" validation ".parse::<PracticeMode>().unwrap(), PracticeMode::Validation);
        assert!("scored".parse::<PracticeMode>().is_err());
    }

    #[test]
    fn test_mode_serialization_roundtrip() {
        for mode in PracticeMode::ALL {
            let json = serde_json::to_string(mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
            let parsed: PracticeMode = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, *mode);
        }
    }

    #[test]
    fn test_state_progress() {
        let state = PracticeState {
            mode: PracticeMode::Validation,
            target_label: Some(Label::from("A")),
            consecutive_correct: 2,
            required_correct: 5,
            confidence_threshold: 0.6,
            settling: false,
        };
        assert!((state.progress() - 0.4).abs() < f32::EPSILON);
    }
}
