//! Device-free collaborators for running sessions without a camera or model.

mod replay_classifier;
mod synthetic_source;

pub use replay_classifier::{ReplayClassifier, ReplayOutcome};
pub use synthetic_source::{CameraFailure, SyntheticFrameSource};
