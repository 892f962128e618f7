//! Store metrics collection.
//!
//! Provides standardized metrics for monitoring tier operations:
//! - Operation counters by tier and outcome
//! - Latency histograms
//! - Retry counters

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total store operations by tier, operation and outcome.
    pub const OPERATIONS_TOTAL: &str = "vgen_store_operations_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "vgen_store_retries_total";

    /// Operation latency in seconds by tier and operation.
    pub const LATENCY_SECONDS: &str = "vgen_store_latency_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed tier operation.
pub fn record_operation(tier: &str, operation: &str, ok: bool, latency_ms: f64) {
    counter!(
        names::OPERATIONS_TOTAL,
        "tier" => tier.to_string(),
        "operation" => operation.to_string(),
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "tier" => tier.to_string(),
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}
