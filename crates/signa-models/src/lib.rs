//! Shared data models for the Signa practice engine.
//!
//! This crate provides Serde-serializable types for:
//! - Labels and the label catalog
//! - Classification events and run-length history entries
//! - Practice modes and practice state snapshots
//! - Session summaries and cross-session progress reports
//! - Session update messages for observers

pub mod event;
pub mod label;
pub mod practice;
pub mod progress;
pub mod session;
pub mod update;

// Re-export common types
pub use event::{ClassificationEvent, HistoryEntry};
pub use label::{CatalogError, CatalogResult, Label, LabelCatalog};
pub use practice::{PracticeMode, PracticeModeParseError, PracticeState};
pub use progress::{League, ProgressReport};
pub use session::{rank_sign_counts, SessionId, SessionSummary, SignCount};
pub use update::SessionUpdate;
