//! Provider request metrics.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

pub mod names {
    /// Total provider requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "vgen_provider_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "vgen_provider_latency_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed provider request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}
