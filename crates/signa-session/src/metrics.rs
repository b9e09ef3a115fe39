//! Practice session metrics.

use metrics::{counter, histogram};

use signa_models::SessionSummary;

/// Metric name constants for consistency.
pub mod names {
    /// Classification events observed by sessions.
    pub const EVENTS_OBSERVED_TOTAL: &str = "signa_session_events_observed_total";

    /// Targets reproduced the required number of times.
    pub const TARGETS_COMPLETED_TOTAL: &str = "signa_session_targets_completed_total";

    /// Sessions ended, by whether a summary was produced.
    pub const SESSIONS_ENDED_TOTAL: &str = "signa_session_sessions_ended_total";

    /// Length of summarised sessions in seconds.
    pub const SESSION_SECONDS: &str = "signa_session_duration_seconds";
}

pub fn record_event_observed() {
    counter!(names::EVENTS_OBSERVED_TOTAL).increment(1);
}

pub fn record_target_completed() {
    counter!(names::TARGETS_COMPLETED_TOTAL).increment(1);
}

/// Record the end of a session.
pub fn record_session_ended(summary: Option<&SessionSummary>) {
    let outcome = if summary.is_some() { "summarized" } else { "empty" };
    counter!(names::SESSIONS_ENDED_TOTAL, "outcome" => outcome).increment(1);

    if let Some(summary) = summary {
        histogram!(names::SESSION_SECONDS).record(summary.seconds_elapsed);
    }
}
