//! Monotonic millisecond timestamps for classifier calls.

use chrono::Utc;

/// Wall-clock milliseconds that never go backwards.
///
/// The classifier's video mode rejects timestamps that do not increase, so
/// if the system clock stalls or steps back the clock keeps counting from
/// the last value it handed out.
#[derive(Debug, Clone, Default)]
pub struct MonotonicClock {
    last_ms: Option<u64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp from the system clock.
    pub fn next_ms(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.next_from(now)
    }

    /// Next timestamp given a raw wall-clock reading.
    pub fn next_from(&mut self, now_ms: u64) -> u64 {
        let next = match self.last_ms {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        self.last_ms = Some(next);
        next
    }

    /// Last timestamp handed out.
    pub fn last_ms(&self) -> Option<u64> {
        self.last_ms
    }
}
