//! Classification events and run-length history entries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Label;

/// One confident-or-not reading from the gesture classifier.
///
/// Produced once per detection tick that yields at least one candidate.
/// Ticks without a detected sign produce no event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationEvent {
    pub label: Label,
    /// Classifier score in `[0, 1]`.
    pub confidence: f32,
    /// Monotonic timestamp in milliseconds; never decreases within a session.
    pub timestamp_ms: u64,
}

impl ClassificationEvent {
    /// Create an event, clamping the confidence into `[0, 1]`.
    pub fn new(label: impl Into<Label>, confidence: f32, timestamp_ms: u64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
            timestamp_ms,
        }
    }

    /// Confidence as a rounded percentage, as shown on the progress bar.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round() as u8
    }
}

/// One run of consecutive identical labels in the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub label: Label,
    /// Number of consecutive events in this run; always at least 1.
    pub run_length: u32,
}

impl HistoryEntry {
    pub fn new(label: impl Into<Label>, run_length: u32) -> Self {
        Self {
            label: label.into(),
            run_length: run_length.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_confidence_is_clamped() {
        assert_eq!(ClassificationEvent::new("A", 1.4, 0).confidence, 1.0);
        assert_eq!(ClassificationEvent::new("A", -0.2, 0).confidence, 0.0);
        assert_eq!(ClassificationEvent::new("A", f32::NAN, 0).confidence, 0.0);
    }

    #[test]
    fn test_confidence_percent() {
        let event = ClassificationEvent::new("B", 0.876, 10);
        assert_eq!(event.confidence_percent(), 88);
    }

    #[test]
    fn test_event_serialization() {
        let event = ClassificationEvent::new("C", 0.5, 42);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"label":"C","confidence":0.5,"timestampMs":42}"#);
    }

    #[test]
    fn test_history_entry_run_length_at_least_one() {
        assert_eq!(HistoryEntry::new("A", 0).run_length, 1);
        assert_eq!(HistoryEntry::new("A", 3).run_length, 3);
    }
}
