//! # Reconciliation Metrics
//!
//! Prometheus metrics for validation and apply activity.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! pathway-config = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `pathway_validations_total` - Counter of validator outcomes (by outcome)
//! - `pathway_apply_results_total` - Counter of per-pathway apply results (by result)
//! - `pathway_batches_rejected_total` - Counter of all-or-nothing aborts
//! - `pathway_submission_seconds` - Histogram of submission latency

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Validator outcomes, labeled by outcome
    pub static ref VALIDATIONS: CounterVec = register_counter_vec!(
        "pathway_validations_total",
        "Total number of pathway validations",
        &["outcome"]
    )
    .expect("Failed to create VALIDATIONS metric");

    /// Per-pathway apply results, labeled by result
    pub static ref APPLY_RESULTS: CounterVec = register_counter_vec!(
        "pathway_apply_results_total",
        "Total number of per-pathway apply results",
        &["result"]
    )
    .expect("Failed to create APPLY_RESULTS metric");

    /// Batches aborted before submission
    pub static ref BATCHES_REJECTED: IntCounter = register_int_counter!(
        "pathway_batches_rejected_total",
        "Total number of batches aborted in all-or-nothing mode"
    )
    .expect("Failed to create BATCHES_REJECTED metric");

    /// Submission latency
    pub static ref SUBMISSION_SECONDS: Histogram = register_histogram!(
        "pathway_submission_seconds",
        "Time from submission to confirmation, timeout or failure"
    )
    .expect("Failed to create SUBMISSION_SECONDS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a validator outcome
#[cfg(feature = "metrics")]
pub fn record_validation(outcome: &str) {
    VALIDATIONS.with_label_values(&[outcome]).inc();
}

/// Record a per-pathway apply result
#[cfg(feature = "metrics")]
pub fn record_apply_result(result: &str) {
    APPLY_RESULTS.with_label_values(&[result]).inc();
}

/// Record an aborted batch
#[cfg(feature = "metrics")]
pub fn record_batch_rejected() {
    BATCHES_REJECTED.inc();
}

/// Record submission latency
#[cfg(feature = "metrics")]
pub fn record_submission_latency(seconds: f64) {
    SUBMISSION_SECONDS.observe(seconds);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_validation(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_apply_result(_result: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_batch_rejected() {}

#[cfg(not(feature = "metrics"))]
pub fn record_submission_latency(_seconds: f64) {}
