//! Per-run loop statistics and the frames-per-second counter.

use std::time::{Duration, Instant};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// Frame source not producing real frames yet.
    NotReady,
    /// A classification event was emitted.
    Emitted,
    /// The classifier found no sign.
    Idle,
    /// The classifier call failed; tick skipped.
    Failed,
    /// The classifier call overran its budget; treated as idle.
    TimedOut,
    /// Stop was requested while the tick was in flight; result dropped.
    Cancelled,
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickOutcome::NotReady => "not_ready",
            TickOutcome::Emitted => "emitted",
            TickOutcome::Idle => "idle",
            TickOutcome::Failed => "failed",
            TickOutcome::TimedOut => "timed_out",
            TickOutcome::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one run of the detection loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub emitted: u64,
    pub idle: u64,
    pub not_ready: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    /// Classified ticks in the last complete one-second window.
    pub fps: u32,
}

impl LoopStats {
    pub fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::NotReady => self.not_ready += 1,
            TickOutcome::Emitted => self.emitted += 1,
            TickOutcome::Idle => self.idle += 1,
            TickOutcome::Failed => self.failed += 1,
            TickOutcome::TimedOut => self.timed_out += 1,
            TickOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Ticks that reached the classifier and returned in time.
    pub fn classified(&self) -> u64 {
        self.emitted + self.idle
    }
}

/// Counts classified frames over one-second windows.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    window_start: Instant,
    frames: u32,
    current: u32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window: Duration::from_secs(1),
            window_start: now,
            frames: 0,
            current: 0,
        }
    }

    /// Count one frame. Returns the new reading when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.window_start) >= self.window {
            self.current = self.frames;
            self.frames = 0;
            self.window_start = now;
            return Some(self.current);
        }
        None
    }

    pub fn current(&self) -> u32 {
        self.current
    }
}
