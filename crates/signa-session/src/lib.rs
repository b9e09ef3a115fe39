//! Practice session controller for sign gesture recognition.
//!
//! This crate provides:
//! - Run-length aggregation of the classification stream
//! - The practice state machine (targets, scoring, Validation/Manual modes)
//! - End-of-session summaries
//! - `SessionController`, which ties the detection loop, scoring,
//!   summarization and persistence together and publishes `SessionUpdate`s

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod practice;
pub mod summarizer;

pub use aggregator::StreamAggregator;
pub use config::{RunnerConfig, SessionConfig};
pub use controller::SessionController;
pub use error::{SessionError, SessionResult};
pub use logging::SessionLogger;
pub use practice::{PracticeController, PracticeOutcome};
pub use summarizer::{elapsed_seconds, SessionSummarizer, DEFAULT_TOP_SIGNS};
