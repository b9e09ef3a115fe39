//! Detection loop metrics.
//!
//! Provides standardized metrics for monitoring the frame loop:
//! - Tick counters by outcome
//! - Classifier latency histogram
//! - Frames-per-second gauge

use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::detection::TickOutcome;

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total detection ticks by outcome.
    pub const TICKS_TOTAL: &str = "signa_detection_ticks_total";

    /// Classifier call latency in seconds.
    pub const CLASSIFY_LATENCY_SECONDS: &str = "signa_classify_latency_seconds";

    /// Classified frames per second.
    pub const DETECTION_FPS: &str = "signa_detection_fps";

    /// Camera acquisitions by result.
    pub const CAMERA_ACQUIRE_TOTAL: &str = "signa_camera_acquire_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record the outcome of one tick.
pub fn record_tick(outcome: TickOutcome) {
    counter!(names::TICKS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Record how long a classifier call took.
pub fn record_classify_latency(elapsed: Duration) {
    histogram!(names::CLASSIFY_LATENCY_SECONDS).record(elapsed.as_secs_f64());
}

/// Record the latest frames-per-second reading.
pub fn record_fps(fps: u32) {
    gauge!(names::DETECTION_FPS).set(fps as f64);
}

/// Record a camera acquisition attempt.
pub fn record_camera_acquire(success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!(names::CAMERA_ACQUIRE_TOTAL, "result" => result).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
