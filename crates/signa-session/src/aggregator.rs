//! Run-length history of the classification stream.

use signa_models::{ClassificationEvent, HistoryEntry};

/// Collapses the event stream into runs of identical labels.
///
/// Events must be observed in non-decreasing timestamp order, which the
/// detection loop guarantees by delivering them in tick order. Out-of-order
/// events are not reordered; the resulting history is meaningless.
#[derive(Debug, Clone, Default)]
pub struct StreamAggregator {
    history: Vec<HistoryEntry>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, extending the last run when the label repeats.
    pub fn observe(&mut self, event: &ClassificationEvent) {
        match self.history.last_mut() {
            Some(last) if last.label == event.label => {
                last.run_length = last.run_length.saturating_add(1);
            }
            _ => self.history.push(HistoryEntry::new(event.label.clone(), 1)),
        }
    }

    /// Drop all history.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Copy of the current history.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.history.clone()
    }

    /// Number of runs.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The run currently being extended.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Total events observed.
    pub fn total_events(&self) -> u64 {
        self.history.iter().map(|e| e.run_length as u64).sum()
    }
}
