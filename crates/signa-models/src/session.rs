//! Session identifiers and the end-of-session summary record.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Label;

/// Unique identifier for a practice session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Total detections of one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignCount {
    pub label: Label,
    pub count: u64,
}

impl SignCount {
    pub fn new(label: impl Into<Label>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Fold `(label, count)` pairs into per-label totals and rank them.
///
/// Totals are ordered by descending count. Equal counts keep the order in
/// which their label was first seen. At most `limit` entries are returned.
pub fn rank_sign_counts<I>(counts: I, limit: usize) -> Vec<SignCount>
where
    I: IntoIterator<Item = (Label, u64)>,
{
    let mut totals: Vec<SignCount> = Vec::new();
    let mut index: HashMap<Label, usize> = HashMap::new();

    for (label, count) in counts {
        match index.get(&label) {
            Some(&i) => totals[i].count += count,
            None => {
                index.insert(label.clone(), totals.len());
                totals.push(SignCount { label, count });
            }
        }
    }

    // `sort_by` is stable, so first-seen order breaks ties.
    totals.sort_by(|a, b| b.count.cmp(&a.count));
    totals.truncate(limit);
    totals
}

/// Compact record of one completed practice session.
///
/// Created once when a session ends with at least one detected sign;
/// immutable afterwards and handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    /// Owner of the session, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Most detected signs, highest count first.
    pub top_signs: Vec<SignCount>,
    /// When the camera started producing; absent if the session never started properly.
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    /// Session length in seconds, rounded to hundredths; never negative.
    pub seconds_elapsed: f64,
}

impl SessionSummary {
    /// Total detections across the ranked signs.
    pub fn total_signs(&self) -> u64 {
        self.top_signs.iter().map(|s| s.count).sum()
    }

    /// The most detected sign, if any.
    pub fn top_sign(&self) -> Option<&SignCount> {
        self.top_signs.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, u64)]) -> Vec<(Label, u64)> {
        items.iter().map(|(l, c)| (Label::from(*l), *c)).collect()
    }

    #[test]
    fn test_session_id_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from_string("abc").as_str(), "abc");
    }

    #[test]
    fn test_rank_folds_recurring_labels() {
        let ranked = rank_sign_counts(pairs(&[("A", 3), ("B", 2), ("A", 4)]), 5);
        assert_eq!(ranked, vec![SignCount::new("A", 7), SignCount::new("B", 2)]);
    }

    #[test]
    fn test_rank_ties_keep_first_seen_order() {
        let ranked = rank_sign_counts(pairs(&[("C", 2), ("A", 2), ("B", 5), ("D", 2)]), 5);
        let labels: Vec<&str> = ranked.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let ranked = rank_sign_counts(
            pairs(&[("A", 1), ("B", 2), ("C", 3), ("D", 4), ("E", 5), ("F", 6)]),
            5,
        );
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0], SignCount::new("F", 6));
        assert!(ranked.iter().all(|s| s.label.as_str() != "A"));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = SessionSummary {
            session_id: SessionId::from_string("s-1"),
            user_id: None,
            top_signs: vec![SignCount::new("A", 7)],
            started_at: None,
            ended_at: Utc::now(),
            seconds_elapsed: 0.0,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["topSigns"][0]["label"], "A");
        assert_eq!(json["topSigns"][0]["count"], 7);
        assert!(json.get("userId").is_none());
        assert_eq!(summary.total_signs(), 7);
    }
}
