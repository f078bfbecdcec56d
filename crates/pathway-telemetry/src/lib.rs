//! # Pathway Telemetry
//!
//! Observability for the pathway wiring tools.
//!
//! ## Components
//!
//! - Structured logs via `tracing-subscriber` (pretty or JSON, to stderr)
//! - Prometheus metrics in the default registry, rendered on demand
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pathway_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PW_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `PW_JSON_LOGS` | `false` | JSON log lines |
//! | `PW_CONSOLE_OUTPUT` | `true` | Emit logs at all |
//! | `PW_SERVICE_NAME` | `pathway-wiring` | Service name |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, record_command, CommandTimer};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to encode Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging. Returns a guard held for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "Shutting down telemetry");
    }
}
