//! End-of-session summary.

use chrono::{DateTime, Utc};

use signa_models::{rank_sign_counts, HistoryEntry, SessionId, SessionSummary};

/// Default number of ranked signs in a summary.
pub const DEFAULT_TOP_SIGNS: usize = 5;

/// Turns a session's run-length history into a `SessionSummary`.
#[derive(Debug, Clone, Copy)]
pub struct SessionSummarizer {
    top_n: usize,
}

impl Default for SessionSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_SIGNS)
    }
}

impl SessionSummarizer {
    pub fn new(top_n: usize) -> Self {
        Self { top_n: top_n.max(1) }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Summarize a history.
    ///
    /// Blank labels are discarded, runs of the same label are summed and the
    /// totals ranked by count (ties keep first-seen order). Returns `None`
    /// when nothing is left to rank; an empty session must not be persisted.
    pub fn summarize(
        &self,
        history: &[HistoryEntry],
        started_at: Option<DateTime<Utc>>,
        ended_at: DateTime<Utc>,
    ) -> Option<SessionSummary> {
        let counts = history
            .iter()
            .filter(|entry| !entry.label.is_blank())
            .map(|entry| (entry.label.clone(), entry.run_length as u64));
        let top_signs = rank_sign_counts(counts, self.top_n);
        if top_signs.is_empty() {
            return None;
        }

        Some(SessionSummary {
            session_id: SessionId::new(),
            user_id: None,
            top_signs,
            started_at,
            ended_at,
            seconds_elapsed: elapsed_seconds(started_at, ended_at),
        })
    }
}

/// Seconds between two instants, rounded to hundredths.
///
/// Zero when the start was never recorded or lies after the end.
pub fn elapsed_seconds(started_at: Option<DateTime<Utc>>, ended_at: DateTime<Utc>) -> f64 {
    let Some(started_at) = started_at else {
        return 0.0;
    };
    let millis = (ended_at - started_at).num_milliseconds().max(0);
    (millis as f64 / 10.0).round() / 100.0
}
