//! # Outbound Ports
//!
//! Traits for external collaborators (deployment records, live endpoint
//! configuration, transaction submission).

use crate::domain::{Address, ApplyInstruction, EndpointId, LiveState, PathwayError, PathwayKey};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use thiserror::Error;

/// Supplies deployed endpoint addresses - outbound port.
///
/// Called once at startup; the output is authoritative for the session.
pub trait DeploymentProvider: Send + Sync {
    /// All `(endpoint id, deployed address)` pairs.
    fn deployments(&self) -> Result<Vec<(EndpointId, Address)>, PathwayError>;
}

/// Reads the configuration currently enforced by the endpoint - outbound port.
#[async_trait]
pub trait LiveStateSource: Send + Sync {
    /// Every fully configured pathway.
    async fn live_state(&self) -> Result<LiveState, PathwayError>;
}

/// Submits apply instructions - outbound port.
///
/// Returning `Ok` means the submitter observed confirmation.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit the ordered updates for one pathway and await confirmation.
    async fn submit(&self, instruction: &ApplyInstruction) -> Result<(), SubmitError>;
}

/// Submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Transaction reverted.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Confirmation did not arrive in time.
    #[error("Confirmation timed out")]
    Timeout,

    /// Could not reach the chain.
    #[error("Transport error: {0}")]
    Transport(String),
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock submitter that records every instruction it receives.
#[derive(Default)]
pub struct RecordingSubmitter {
    /// Instructions in submission order.
    pub submitted: Mutex<Vec<ApplyInstruction>>,
    /// Keys that revert.
    pub reverting: HashSet<PathwayKey>,
}

impl RecordingSubmitter {
    /// Submitter that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submitter that reverts the given keys.
    pub fn reverting(keys: impl IntoIterator<Item = PathwayKey>) -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            reverting: keys.into_iter().collect(),
        }
    }

    /// Keys submitted so far.
    pub fn submitted_keys(&self) -> Vec<PathwayKey> {
        self.submitted.lock().iter().map(|i| i.key).collect()
    }
}

#[async_trait]
impl TransactionSubmitter for RecordingSubmitter {
    async fn submit(&self, instruction: &ApplyInstruction) -> Result<(), SubmitError> {
        self.submitted.lock().push(instruction.clone());
        if self.reverting.contains(&instruction.key) {
            return Err(SubmitError::Reverted("Mock revert".to_string()));
        }
        Ok(())
    }
}
