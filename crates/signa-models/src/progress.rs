//! Cross-session progress: merged top signs and practice leagues.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{rank_sign_counts, SessionSummary, SignCount};

/// Number of signs shown in the merged ranking.
const TOP_SIGNS: usize = 5;

/// Practice league reached by total signs practised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum League {
    Beginner,
    Apprentice,
    Expert,
    Master,
    Champion,
}

impl League {
    /// All leagues, lowest first.
    pub const ALL: &'static [League] = &[
        League::Beginner,
        League::Apprentice,
        League::Expert,
        League::Master,
        League::Champion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            League::Beginner => "beginner",
            League::Apprentice => "apprentice",
            League::Expert => "expert",
            League::Master => "master",
            League::Champion => "champion",
        }
    }

    /// Minimum total signs to enter this league.
    pub fn min_signs(&self) -> u64 {
        match self {
            League::Beginner => 0,
            League::Apprentice => 20,
            League::Expert => 50,
            League::Master => 100,
            League::Champion => 200,
        }
    }

    /// League for a total number of signs practised.
    pub fn for_total(total: u64) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|league| total >= league.min_signs())
            .unwrap_or(League::Beginner)
    }

    /// The next league up, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            League::Beginner => Some(League::Apprentice),
            League::Apprentice => Some(League::Expert),
            League::Expert => Some(League::Master),
            League::Master => Some(League::Champion),
            League::Champion => None,
        }
    }
}

/// Aggregated practice progress for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub sessions: usize,
    pub total_signs: u64,
    pub total_seconds: f64,
    pub top_signs: Vec<SignCount>,
    pub league: League,
    pub next_league: Option<League>,
    /// Percentage of the way to the next league; 100 at the top league.
    pub progress_to_next: f64,
}

impl ProgressReport {
    /// Merge persisted summaries into a single report.
    pub fn from_summaries(summaries: &[SessionSummary]) -> Self {
        let counts = summaries
            .iter()
            .flat_map(|s| s.top_signs.iter())
            .map(|s| (s.label.clone(), s.count));
        let all = rank_sign_counts(counts, usize::MAX);

        let total_signs: u64 = all.iter().map(|s| s.count).sum();
        let total_seconds = summaries.iter().map(|s| s.seconds_elapsed).sum();
        let league = League::for_total(total_signs);
        let next_league = league.next();
        let progress_to_next = match next_league {
            Some(next) => {
                let span = (next.min_signs() - league.min_signs()) as f64;
                (total_signs - league.min_signs()) as f64 / span * 100.0
            }
            None => 100.0,
        };

        let mut top_signs = all;
        top_signs.truncate(TOP_SIGNS);

        Self {
            sessions: summaries.len(),
            total_signs,
            total_seconds,
            top_signs,
            league,
            next_league,
            progress_to_next,
        }
    }
}
