//! In-process summary store.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use signa_models::SessionSummary;

use crate::error::StoreResult;
use crate::metrics;
use crate::store::{validate_user, SummaryStore};

/// Summaries kept in memory, keyed by user.
#[derive(Debug, Default)]
pub struct InMemorySummaryStore {
    sessions: RwLock<HashMap<String, Vec<SessionSummary>>>,
}

impl InMemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of summaries across all users.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn save(&self, user_id: &str, summary: &SessionSummary) -> StoreResult<()> {
        let started = Instant::now();
        let result = validate_user(user_id);
        if result.is_ok() {
            self.sessions
                .write()
                .await
                .entry(user_id.to_string())
                .or_default()
                .push(summary.clone());
            debug!(user_id, session_id = %summary.session_id, "Stored session summary");
        }
        metrics::record_operation(self.backend(), "save", result.is_ok(), started.elapsed());
        result
    }

    async fn list(&self, user_id: &str) -> StoreResult<Vec<SessionSummary>> {
        validate_user(user_id)?;
        Ok(self
            .sessions
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
