//! The summary store seam.

use async_trait::async_trait;

use signa_models::{ProgressReport, SessionSummary};

use crate::error::{StoreError, StoreResult};

/// Persistence for completed session summaries.
///
/// Writes are fire-and-forget from the session's point of view: a failed
/// save is logged and never retried by the caller.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Persist a summary under `user_id`.
    async fn save(&self, user_id: &str, summary: &SessionSummary) -> StoreResult<()>;

    /// All summaries stored for `user_id`, oldest first.
    async fn list(&self, user_id: &str) -> StoreResult<Vec<SessionSummary>>;

    /// Merged progress across every stored session of `user_id`.
    async fn progress(&self, user_id: &str) -> StoreResult<ProgressReport> {
        let summaries = self.list(user_id).await?;
        Ok(ProgressReport::from_summaries(&summaries))
    }

    /// Backend name for logging and metrics.
    fn backend(&self) -> &'static str;
}

/// Reject empty or whitespace-only user ids.
pub(crate) fn validate_user(user_id: &str) -> StoreResult<()> {
    if user_id.trim().is_empty() {
        return Err(StoreError::invalid_user(user_id));
    }
    Ok(())
}
