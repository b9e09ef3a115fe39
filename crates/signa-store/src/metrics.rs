//! Summary store metrics.
//!
//! - Operation counters by backend, operation and status
//! - Latency histograms

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Store operations by backend, operation and status.
    pub const OPERATIONS_TOTAL: &str = "signa_store_operations_total";

    /// Operation latency in seconds by backend and operation.
    pub const LATENCY_SECONDS: &str = "signa_store_latency_seconds";
}

/// Record a completed store operation.
pub fn record_operation(backend: &'static str, operation: &'static str, ok: bool, latency: Duration) {
    counter!(
        names::OPERATIONS_TOTAL,
        "backend" => backend,
        "operation" => operation,
        "status" => if ok { "ok" } else { "error" }
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "backend" => backend,
        "operation" => operation
    )
    .record(latency.as_secs_f64());
}
