//! Practice state machine: targets, scoring and mode switching.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::debug;

use signa_models::{ClassificationEvent, Label, LabelCatalog, PracticeMode, PracticeState};

/// Effect of one classification event on the practice state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeOutcome {
    /// Manual mode or no target: nothing is scored.
    Ignored,
    /// Confidence at or below the threshold; neither a hit nor a miss.
    Inconclusive,
    /// Waiting for the next target after a completion.
    Settling,
    /// Correct sign; `consecutive` is the new run length.
    Progress { consecutive: u32 },
    /// Confident wrong sign; the run went back to zero.
    Reset { previous: u32 },
    /// The run reached the required length.
    TargetCompleted { label: Label },
}

/// Owns the practice state. No other component mutates it.
#[derive(Debug)]
pub struct PracticeController {
    catalog: Arc<LabelCatalog>,
    mode: PracticeMode,
    target: Option<Label>,
    consecutive_correct: u32,
    required_correct: u32,
    confidence_threshold: f32,
    settling: bool,
    /// Bumped on every settle start and cancel so stale timers can be told apart.
    settle_ticket: u64,
    rng: StdRng,
}

impl PracticeController {
    pub fn new(catalog: Arc<LabelCatalog>, required_correct: u32, confidence_threshold: f32) -> Self {
        Self {
            catalog,
            mode: PracticeMode::default(),
            target: None,
            consecutive_correct: 0,
            required_correct: required_correct.max(1),
            confidence_threshold,
            settling: false,
            settle_ticket: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a seeded generator for target selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    pub fn target(&self) -> Option<&Label> {
        self.target.as_ref()
    }

    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    pub fn required_correct(&self) -> u32 {
        self.required_correct
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn is_settling(&self) -> bool {
        self.settling
    }

    /// Ticket of the pending settle, if one is running.
    pub fn settle_ticket(&self) -> Option<u64> {
        self.settling.then_some(self.settle_ticket)
    }

    /// Score one event.
    pub fn on_event(&mut self, event: &ClassificationEvent) -> PracticeOutcome {
        if !self.mode.is_scored() {
            return PracticeOutcome::Ignored;
        }
        let Some(target) = self.target.as_ref() else {
            return PracticeOutcome::Ignored;
        };
        if self.settling {
            return PracticeOutcome::Settling;
        }
        if event.confidence <= self.confidence_threshold {
            return PracticeOutcome::Inconclusive;
        }

        if &event.label != target {
            let previous = self.consecutive_correct;
            self.consecutive_correct = 0;
            if previous > 0 {
                debug!(target = %target, got = %event.label, previous, "Run broken");
            }
            return PracticeOutcome::Reset { previous };
        }

        self.consecutive_correct += 1;
        if self.consecutive_correct < self.required_correct {
            return PracticeOutcome::Progress {
                consecutive: self.consecutive_correct,
            };
        }

        self.consecutive_correct = self.required_correct;
        self.settling = true;
        self.settle_ticket += 1;
        debug!(target = %target, ticket = self.settle_ticket, "Target completed, settling");
        PracticeOutcome::TargetCompleted {
            label: target.clone(),
        }
    }

    /// Set the target and restart the run. Cancels a pending settle.
    pub fn set_target(&mut self, label: Label) {
        self.target = Some(label);
        self.restart_run();
    }

    /// Remove the target; nothing is scored until a new one is set.
    pub fn clear_target(&mut self) {
        self.target = None;
        self.restart_run();
    }

    /// Switch between Validation and Manual. Always restarts the run.
    pub fn toggle_mode(&mut self) -> PracticeMode {
        self.mode = self.mode.toggled();
        self.restart_run();
        self.mode
    }

    /// Pick a random catalog label as the new target.
    ///
    /// Uniform over the whole catalog, so the previous target may come up
    /// again. Returns `None` and leaves the target unchanged when the
    /// catalog is empty.
    pub fn change_target(&mut self) -> Option<Label> {
        let label = self.catalog.labels().choose(&mut self.rng)?.clone();
        self.set_target(label.clone());
        Some(label)
    }

    /// End the settle phase identified by `ticket` with a new random target.
    ///
    /// Returns `None` if that settle was cancelled or already finished.
    pub fn advance(&mut self, ticket: u64) -> Option<Label> {
        if self.settle_ticket() != Some(ticket) {
            return None;
        }
        match self.change_target() {
            Some(label) => Some(label),
            None => {
                self.restart_run();
                None
            }
        }
    }

    /// Manual mode: move to the next catalog label, wrapping around.
    pub fn browse_next(&mut self) -> Option<Label> {
        self.browse(1)
    }

    /// Manual mode: move to the previous catalog label, wrapping around.
    pub fn browse_previous(&mut self) -> Option<Label> {
        self.browse(-1)
    }

    fn browse(&mut self, step: isize) -> Option<Label> {
        if self.mode != PracticeMode::Manual || self.catalog.is_empty() {
            return None;
        }
        let len = self.catalog.len() as isize;
        let next = match self.target.as_ref().and_then(|t| self.catalog.position(t)) {
            Some(i) => (i as isize + step).rem_euclid(len),
            None if step > 0 => 0,
            None => len - 1,
        };
        let label = self.catalog.get(next as usize)?.clone();
        self.set_target(label.clone());
        Some(label)
    }

    /// Clear per-session state. The mode is kept.
    pub fn reset(&mut self) {
        self.clear_target();
    }

    pub fn snapshot(&self) -> PracticeState {
        PracticeState {
            mode: self.mode,
            target_label: self.target.clone(),
            consecutive_correct: self.consecutive_correct,
            required_correct: self.required_correct,
            confidence_threshold: self.confidence_threshold,
            settling: self.settling,
        }
    }

    fn restart_run(&mut self) {
        self.consecutive_correct = 0;
        if self.settling {
            self.settling = false;
            self.settle_ticket += 1;
        }
    }
}
