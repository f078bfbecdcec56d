//! Prometheus metrics for the wiring tools.
//!
//! Library crates register their metrics in the default Prometheus registry;
//! this module adds command-level metrics and renders the whole registry.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Commands run, labeled by command and outcome
    pub static ref COMMANDS_RUN: IntCounterVec = register_int_counter_vec!(
        "pathway_commands_total",
        "Total number of commands run",
        &["command", "outcome"]
    )
    .expect("metric creation failed");

    /// Command duration, labeled by command
    pub static ref COMMAND_DURATION: HistogramVec = register_histogram_vec!(
        "pathway_command_duration_seconds",
        "Wall-clock time per command",
        &["command"],
        exponential_buckets(0.001, 2.0, 15).expect("valid buckets")
    )
    .expect("metric creation failed");
}

/// Record a finished command.
pub fn record_command(command: &str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    COMMANDS_RUN.with_label_values(&[command, outcome]).inc();
}

/// Encode the default registry as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct CommandTimer {
    command: String,
    start: std::time::Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        COMMAND_DURATION
            .with_label_values(&[self.command.as_str()])
            .observe(duration);
    }
}

/// Start timing a command. Observation happens on drop.
#[macro_export]
macro_rules! time_command {
    ($command:expr) => {
        $crate::metrics::CommandTimer::new($command)
    };
}
