//! # Domain Errors
//!
//! Error and finding types for pathway configuration.
//!
//! Structural errors ([`ValidationError`]) are raised at construction time.
//! Security findings are either fatal ([`Rejection`]) or advisory
//! ([`Advisory`]); apply failures are reported per pathway ([`ApplyFailure`]).

use super::entities::ApplyResult;
use super::value_objects::{Address, Direction, EndpointId, PathwayKey};
use std::collections::BTreeMap;
use thiserror::Error;

/// Endpoint registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Id already registered with a different transport address.
    #[error("Duplicate endpoint {id}: registered {existing}, attempted {attempted}")]
    DuplicateEndpoint {
        /// Endpoint id.
        id: EndpointId,
        /// Address already on record.
        existing: Address,
        /// Conflicting address.
        attempted: Address,
    },

    /// Id not present in the registry.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(EndpointId),
}

/// Structural invariant violations. A descriptor carrying one of these can
/// never be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Pathway from an endpoint to itself.
    #[error("Pathway targets its own endpoint {0}")]
    SelfLoop(EndpointId),

    /// Agent listed as both required and optional.
    #[error("Agent {0} is both required and optional")]
    AgentSetOverlap(Address),

    /// Optional threshold larger than the optional set.
    #[error("Optional threshold {threshold} out of range for {optional} optional agents")]
    ThresholdOutOfRange {
        /// Requested threshold.
        threshold: u8,
        /// Size of the optional set.
        optional: usize,
    },

    /// Executor message size of zero.
    #[error("Executor max message size must be positive")]
    NonPositiveMessageSize,

    /// Same agent listed twice in one list.
    #[error("Agent {0} listed more than once")]
    DuplicateAgent(Address),
}

/// Non-fatal finding the caller must acknowledge before apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Advisory {
    /// Library change (or first-time setup) with a zero grace period:
    /// in-flight messages under the old configuration will not verify.
    #[error("Library change on {key} with zero grace period")]
    GracePeriodWarning {
        /// Affected pathway.
        key: PathwayKey,
    },

    /// Executor capacity shrinks under an explicit `allow_shrink` override.
    #[error("Executor max message size on {key} shrinks {live} -> {candidate}")]
    ExecutorCapacityShrink {
        /// Affected pathway.
        key: PathwayKey,
        /// Size advertised by the live descriptor.
        live: u32,
        /// Size in the candidate.
        candidate: u32,
    },
}

/// Reason a candidate descriptor may not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Structural check failed.
    #[error("Structural check failed: {0}")]
    Structural(#[from] ValidationError),

    /// Required agents shrink below the live set or the security floor.
    #[error("Security regression on {direction}: {candidate} required agents (live {live:?}, floor {floor})")]
    SecurityRegression {
        /// Direction that regressed.
        direction: Direction,
        /// Live required count, if a live descriptor exists.
        live: Option<usize>,
        /// Candidate required count.
        candidate: usize,
        /// Configured minimum.
        floor: usize,
    },

    /// Executor capacity shrinks without `allow_shrink`.
    #[error("Executor max message size shrinks {live} -> {candidate} without override")]
    ExecutorCapacityShrink {
        /// Size advertised by the live descriptor.
        live: u32,
        /// Size in the candidate.
        candidate: u32,
    },

    /// Advisories were raised but not acknowledged by the caller.
    #[error("{} advisory finding(s) not acknowledged", .0.len())]
    Unacknowledged(Vec<Advisory>),
}

/// Per-pathway apply failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyFailure {
    /// Validation blocked the pathway.
    #[error("Rejected: {0}")]
    Rejected(Rejection),

    /// Another apply is in flight for the same pathway.
    #[error("Apply already in progress")]
    ApplyInProgress,

    /// No confirmation before the deadline. State is unknown.
    #[error("Timed out awaiting confirmation")]
    Timeout,

    /// Submitter reported a failure.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Live state no longer matches the state the batch was planned
    /// against. Nothing was submitted.
    #[error("Live state changed since planning")]
    StaleLiveState,
}

/// Top-level pathway configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathwayError {
    /// Registry lookup or registration failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Structural validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Two descriptors declared for the same directed pair.
    #[error("Duplicate pathway {0}")]
    DuplicatePathway(PathwayKey),

    /// All-or-nothing batch aborted before any submission.
    #[error("Batch rejected: {} pathway(s) blocked", count_failed(.results))]
    BatchRejected {
        /// Result for every pathway in the batch.
        results: BTreeMap<PathwayKey, ApplyResult>,
    },

    /// Some pathways failed while others were applied.
    #[error("Partial apply failure: {} pathway(s) failed", count_failed(.results))]
    PartialApplyFailure {
        /// Result for every pathway in the batch.
        results: BTreeMap<PathwayKey, ApplyResult>,
    },

    /// A pathway is already being applied.
    #[error("Apply already in progress for {0}")]
    ApplyInProgress(PathwayKey),

    /// Invalid configuration input.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PathwayError {
    /// Per-pathway results carried by batch errors.
    pub fn results(&self) -> Option<&BTreeMap<PathwayKey, ApplyResult>> {
        match self {
            PathwayError::BatchRejected { results }
            | PathwayError::PartialApplyFailure { results } => Some(results),
            _ => None,
        }
    }

    /// True if some pathway timed out or was planned against stale live
    /// state, so live state must be diffed again.
    pub fn requires_rediff(&self) -> bool {
        self.results().is_some_and(|results| {
            results.values().any(|r| {
                matches!(
                    r,
                    ApplyResult::Failed(ApplyFailure::Timeout | ApplyFailure::StaleLiveState)
                )
            })
        })
    }
}

fn count_failed(results: &BTreeMap<PathwayKey, ApplyResult>) -> usize {
    results.values().filter(|r| r.is_failed()).count()
}

/// Result alias for pathway operations.
pub type PathwayResult<T> = Result<T, PathwayError>;
