//! Gesture classifier interface.
//!
//! The classifier is an external model treated as a black box: given a
//! frame and a monotonic timestamp it returns zero or more ranked
//! `(label, score)` candidates per detected hand. Implementations are
//! injected into the detection loop, so test doubles and alternate models
//! can be substituted without touching the loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierResult;
use crate::frame::Frame;

/// Operating mode of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningMode {
    /// One-off still images (the mode models are loaded in).
    #[default]
    Image,
    /// Continuous video frames with increasing timestamps.
    Video,
}

impl RunningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunningMode::Image => "image",
            RunningMode::Video => "video",
        }
    }
}

/// One ranked guess for a detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(alias = "categoryName")]
    pub label: String,
    pub score: f32,
}

impl Candidate {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Result of one classifier call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    /// One ranked candidate list per detected subject, in classifier order.
    #[serde(default)]
    pub gestures: Vec<Vec<Candidate>>,
}

impl ClassifierOutput {
    /// Nothing detected.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single subject with a single candidate.
    pub fn single(label: impl Into<String>, score: f32) -> Self {
        Self {
            gestures: vec![vec![Candidate::new(label, score)]],
        }
    }

    /// Best candidate of the first detected subject.
    ///
    /// Highest score wins; equal scores keep classifier order. Candidates
    /// with a NaN score are skipped, and a blank winning label counts as no
    /// detection.
    pub fn top_candidate(&self) -> Option<&Candidate> {
        let first = self.gestures.first()?;
        let best = first
            .iter()
            .filter(|c| !c.score.is_nan())
            .fold(None, |best: Option<&Candidate>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })?;

        if best.label.trim().is_empty() {
            None
        } else {
            Some(best)
        }
    }
}

/// Gesture classifier capability injected into the detection loop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Whether the model and its label set finished loading.
    fn is_ready(&self) -> bool;

    /// Switch the operating mode.
    fn set_running_mode(&self, mode: RunningMode) -> ClassifierResult<()>;

    /// Classify one frame.
    ///
    /// `timestamp_ms` strictly increases between calls within a session.
    async fn classify(&self, frame: &Frame, timestamp_ms: u64) -> ClassifierResult<ClassifierOutput>;

    /// Classifier name for logging.
    fn name(&self) -> &'static str;
}
