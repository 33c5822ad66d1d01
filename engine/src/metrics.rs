//! Metrics for engine observability.
//!
//! Counters are recorded through the [`metrics`] facade; installing an
//! exporter (or not) is the embedding application's choice. Without a
//! recorder installed every call is a no-op.

use metrics::{counter, describe_counter};

/// Register descriptions for all engine metrics.
///
/// Call once after installing a metrics recorder so exported counters
/// carry their help text.
pub fn register_engine_metrics() {
    describe_counter!(
        "careflow_attendances_created_total",
        "Total number of attendance records registered"
    );
    describe_counter!(
        "careflow_calls_total",
        "Total number of patients called off the waiting queue"
    );
    describe_counter!(
        "careflow_call_conflicts_total",
        "Total number of claim attempts lost to a concurrent caller"
    );
    describe_counter!(
        "careflow_call_contention_total",
        "Total number of call operations that gave up after exhausting retries"
    );
    describe_counter!(
        "careflow_transitions_total",
        "Total number of attendance status transitions applied"
    );
    describe_counter!(
        "careflow_announcements_total",
        "Total number of call announcements emitted"
    );
}

/// Engine metrics recorder.
pub struct EngineMetrics;

impl EngineMetrics {
    /// Record a registered attendance.
    pub fn record_created() {
        counter!("careflow_attendances_created_total").increment(1);
    }

    /// Record a successful call claim.
    pub fn record_call() {
        counter!("careflow_calls_total").increment(1);
    }

    /// Record a claim attempt lost to a concurrent caller.
    pub fn record_claim_conflict() {
        counter!("careflow_call_conflicts_total").increment(1);
    }

    /// Record a call operation that exhausted its retry budget.
    pub fn record_contention() {
        counter!("careflow_call_contention_total").increment(1);
    }

    /// Record an applied status transition.
    pub fn record_transition() {
        counter!("careflow_transitions_total").increment(1);
    }

    /// Record an emitted announcement.
    pub fn record_announcement() {
        counter!("careflow_announcements_total").increment(1);
    }
}
