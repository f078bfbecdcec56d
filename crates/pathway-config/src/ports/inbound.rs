//! # Inbound Ports
//!
//! The entry points external glue (the CLI) calls.

use crate::algorithms::{ApplyBatch, ConfigurationDiff, ValidationReport};
use crate::domain::{ApplyOptions, ApplyReport, ConfigurationSet, LiveState, PathwayError};
use async_trait::async_trait;

/// Pathway configuration API - inbound port.
#[async_trait]
pub trait PathwayConfigApi: Send + Sync {
    /// Read the current live state from the endpoint.
    async fn live_state(&self) -> Result<LiveState, PathwayError>;

    /// Validation outcome for every create/update the target implies.
    fn validate(&self, live: &LiveState, target: &ConfigurationSet) -> ValidationReport;

    /// Minimal transitions from `live` to `target`.
    fn diff(&self, live: &LiveState, target: &ConfigurationSet) -> ConfigurationDiff;

    /// Apply a prepared batch.
    async fn apply(
        &self,
        batch: ApplyBatch,
        options: ApplyOptions,
    ) -> Result<ApplyReport, PathwayError>;

    /// Read live state, prepare a batch against `target` and apply it.
    async fn reconcile(
        &self,
        target: &ConfigurationSet,
        options: ApplyOptions,
    ) -> Result<ApplyReport, PathwayError>;
}
