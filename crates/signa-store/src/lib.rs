//! Persistence for practice session summaries.
//!
//! This crate provides:
//! - The `SummaryStore` seam used by the session controller
//! - An in-memory store for tests and ephemeral runs
//! - An append-only JSON Lines store for local history
//! - Per-backend operation metrics

pub mod error;
pub mod jsonl;
pub mod memory;
pub mod metrics;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use jsonl::{JsonLinesSummaryStore, StoredSession};
pub use memory::InMemorySummaryStore;
pub use store::SummaryStore;
