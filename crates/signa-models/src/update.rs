//! Session update messages published to observers (UI, overlays).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Label, PracticeMode, SessionId};

/// Update envelope, published in the order detection ticks complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// Camera acquired and the detection loop is running
    Started {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },

    /// The classifier recognised a sign on this tick
    Detected { label: Label, confidence: f32 },

    /// No sign detected on this tick
    Idle,

    /// Consecutive-correct counter changed
    Progress { consecutive: u32, required: u32 },

    /// The target was reproduced `required` times in a row
    TargetCompleted { label: Label },

    /// A new target was assigned
    TargetChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<Label>,
    },

    /// Practice mode switched
    ModeChanged { mode: PracticeMode },

    /// Detection loop stopped and the camera was released
    Stopped {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
}

impl SessionUpdate {
    /// Short name of the update kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionUpdate::Started { .. } => "started",
            SessionUpdate::Detected { .. } => "detected",
            SessionUpdate::Idle => "idle",
            SessionUpdate::Progress { .. } => "progress",
            SessionUpdate::TargetCompleted { .. } => "target_completed",
            SessionUpdate::TargetChanged { .. } => "target_changed",
            SessionUpdate::ModeChanged { .. } => "mode_changed",
            SessionUpdate::Stopped { .. } => "stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_tagging() {
        let update = SessionUpdate::Detected {
            label: Label::from("A"),
            confidence: 0.75,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "detected");
        assert_eq!(json["label"], "A");
        assert_eq!(update.kind(), "detected");
    }

    #[test]
    fn test_idle_serialization() {
        let json = serde_json::to_string(&SessionUpdate::Idle).unwrap();
        assert_eq!(json, r#"{"type":"idle"}"#);
    }

    #[test]
    fn test_started_uses_camel_case_id() {
        let update = SessionUpdate::Started {
            session_id: SessionId::from_string("s-9"),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["sessionId"], "s-9");
    }
}
