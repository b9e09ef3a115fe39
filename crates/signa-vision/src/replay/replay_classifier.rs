//! Classifier that replays a scripted sequence of outputs.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::classifier::{Candidate, Classifier, ClassifierOutput, RunningMode};
use crate::error::{ClassifierError, ClassifierResult, VisionResult};
use crate::frame::Frame;

/// What the classifier returns for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    Detect(ClassifierOutput),
    Fail(String),
}

/// One scripted step as written in JSON.
///
/// `null` is an idle frame, an object with `label`/`score` a single
/// detection, `{"gestures": [[...]]}` a full output and `{"error": "..."}`
/// a failed call.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayStep {
    Fail { error: String },
    Many { gestures: Vec<Vec<Candidate>> },
    One(Candidate),
}

#[derive(Debug, Deserialize)]
struct ReplayScript {
    steps: Vec<Option<ReplayStep>>,
}

impl From<Option<ReplayStep>> for ReplayOutcome {
    fn from(step: Option<ReplayStep>) -> Self {
        match step {
            None => ReplayOutcome::Detect(ClassifierOutput::empty()),
            Some(ReplayStep::Fail { error }) => ReplayOutcome::Fail(error),
            Some(ReplayStep::Many { gestures }) => {
                ReplayOutcome::Detect(ClassifierOutput { gestures })
            }
            Some(ReplayStep::One(candidate)) => ReplayOutcome::Detect(ClassifierOutput {
                gestures: vec![vec![candidate]],
            }),
        }
    }
}

/// Scripted classifier.
///
/// Steps are returned in order and the script wraps around. An empty script
/// detects nothing. Like real video models it refuses to classify until it
/// has been switched to video mode.
#[derive(Debug)]
pub struct ReplayClassifier {
    steps: Vec<ReplayOutcome>,
    cursor: AtomicUsize,
    latency: Option<Duration>,
    ready: AtomicBool,
    mode: Mutex<RunningMode>,
}

impl ReplayClassifier {
    pub fn new(steps: Vec<ReplayOutcome>) -> Self {
        Self {
            steps,
            cursor: AtomicUsize::new(0),
            latency: None,
            ready: AtomicBool::new(true),
            mode: Mutex::new(RunningMode::Image),
        }
    }

    /// Parse a `{"steps": [...]}` script.
    pub fn from_json(json: &str) -> VisionResult<Self> {
        let script: ReplayScript = serde_json::from_str(json)?;
        Ok(Self::new(script.steps.into_iter().map(Into::into).collect()))
    }

    /// Load a script file.
    pub fn load(path: impl AsRef<Path>) -> VisionResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Report the model as still loading.
    pub fn not_ready(self) -> Self {
        self.ready.store(false, Ordering::Release);
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn running_mode(&self) -> RunningMode {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Number of classify calls made so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl Classifier for ReplayClassifier {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn set_running_mode(&self, mode: RunningMode) -> ClassifierResult<()> {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner()) = mode;
        debug!(mode = mode.as_str(), "Replay classifier mode set");
        Ok(())
    }

    async fn classify(&self, frame: &Frame, _timestamp_ms: u64) -> ClassifierResult<ClassifierOutput> {
        if self.running_mode() != RunningMode::Video {
            return Err(ClassifierError::UnsupportedMode(
                RunningMode::Image.as_str().to_string(),
            ));
        }
        if frame.is_empty() {
            return Err(ClassifierError::invalid_frame("zero-size frame"));
        }

        let call = self.cursor.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.steps.is_empty() {
            return Ok(ClassifierOutput::empty());
        }
        match &self.steps[call % self.steps.len()] {
            ReplayOutcome::Detect(output) => Ok(output.clone()),
            ReplayOutcome::Fail(message) => Err(ClassifierError::inference_failed(message.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}
