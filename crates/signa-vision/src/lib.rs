#![deny(unreachable_patterns)]
//! Camera frame loop and gesture classifier plumbing.
//!
//! This crate provides:
//! - The `FrameSource` and `Classifier` seams for the camera and the model
//! - A cancellable, frame-rate `DetectionLoop` that turns classifier output
//!   into timestamped `ClassificationEvent`s
//! - Loop statistics and metrics
//! - Device-free replay collaborators for demos and tests

pub mod classifier;
pub mod detection;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod replay;

pub use classifier::{Candidate, Classifier, ClassifierOutput, RunningMode};
pub use detection::{
    DetectionLoop, DetectionSink, FpsCounter, LoopConfig, LoopState, LoopStats, MonotonicClock,
    TickOutcome,
};
pub use error::{ClassifierError, ClassifierResult, VisionError, VisionResult};
pub use frame::{Frame, FrameSource};
pub use replay::{CameraFailure, ReplayClassifier, ReplayOutcome, SyntheticFrameSource};
