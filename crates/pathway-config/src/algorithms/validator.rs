//! # Security Stack Validator
//!
//! Decides whether a candidate descriptor is safe to apply on top of the
//! currently live descriptor for the same pathway.
//!
//! ## Checks (in order, first rejection wins)
//!
//! | # | Check | Failure |
//! |---|-------|---------|
//! | 1 | Structural invariants | `Rejected(Structural)` |
//! | 2 | Required agents vs floor and live set | `Rejected(SecurityRegression)` |
//! | 3 | Library change with zero grace period | advisory `GracePeriodWarning` |
//! | 4 | Executor max message size shrink | `Rejected` or advisory with `allow_shrink` |

use crate::domain::{
    check_structure, Advisory, Direction, PathwayDescriptor, PathwayKey, Rejection,
    DEFAULT_MIN_REQUIRED_AGENTS,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Operator-tunable security policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Minimum required agents per direction. Zero permits insecure
    /// configurations and should only be used in tests.
    pub min_required_agents: usize,
    /// Allow the executor's max message size to shrink (downgraded to an
    /// advisory).
    pub allow_shrink: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            min_required_agents: DEFAULT_MIN_REQUIRED_AGENTS,
            allow_shrink: false,
        }
    }
}

/// Validator verdict for one candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Safe to apply.
    Accepted,
    /// Safe to apply once the advisories are acknowledged.
    AcceptedWithWarnings(Vec<Advisory>),
    /// Must not be applied.
    Rejected(Rejection),
}

impl ValidationOutcome {
    /// True for [`ValidationOutcome::Rejected`].
    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationOutcome::Rejected(_))
    }

    /// Advisories raised (empty unless `AcceptedWithWarnings`).
    pub fn advisories(&self) -> &[Advisory] {
        match self {
            ValidationOutcome::AcceptedWithWarnings(advisories) => advisories,
            _ => &[],
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationOutcome::Accepted => "accepted",
            ValidationOutcome::AcceptedWithWarnings(_) => "accepted_with_warnings",
            ValidationOutcome::Rejected(_) => "rejected",
        }
    }
}

/// Security stack validator.
#[derive(Clone, Debug, Default)]
pub struct SecurityStackValidator {
    policy: SecurityPolicy,
}

impl SecurityStackValidator {
    /// Create a validator with a policy.
    pub fn new(policy: SecurityPolicy) -> Self {
        Self { policy }
    }

    /// Active policy.
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Validate `candidate` against the live descriptor, if any.
    pub fn validate(
        &self,
        candidate: &PathwayDescriptor,
        live: Option<&PathwayDescriptor>,
    ) -> ValidationOutcome {
        let outcome = self.run_checks(candidate, live);
        debug!(pathway = %candidate.key(), outcome = outcome.label(), "Validated pathway");
        crate::metrics::record_validation(outcome.label());
        outcome
    }

    fn run_checks(
        &self,
        candidate: &PathwayDescriptor,
        live: Option<&PathwayDescriptor>,
    ) -> ValidationOutcome {
        if let Err(e) = check_structure(candidate) {
            return ValidationOutcome::Rejected(Rejection::Structural(e));
        }

        if let Err(rejection) = self.check_required_agents(candidate, live) {
            return ValidationOutcome::Rejected(rejection);
        }

        let mut advisories = Vec::new();
        if let Some(advisory) = check_grace_period(candidate, live) {
            advisories.push(advisory);
        }

        match self.check_executor_capacity(candidate, live) {
            Ok(Some(advisory)) => advisories.push(advisory),
            Ok(None) => {}
            Err(rejection) => return ValidationOutcome::Rejected(rejection),
        }

        if advisories.is_empty() {
            ValidationOutcome::Accepted
        } else {
            ValidationOutcome::AcceptedWithWarnings(advisories)
        }
    }

    fn check_required_agents(
        &self,
        candidate: &PathwayDescriptor,
        live: Option<&PathwayDescriptor>,
    ) -> Result<(), Rejection> {
        let floor = self.policy.min_required_agents;
        for direction in Direction::all() {
            let count = candidate.verification(direction).agents.required().len();
            let live_count = live.map(|l| l.verification(direction).agents.required().len());
            let below_floor = count < floor;
            let shrinks = live_count.is_some_and(|n| count < n);
            if below_floor || shrinks {
                return Err(Rejection::SecurityRegression {
                    direction,
                    live: live_count,
                    candidate: count,
                    floor,
                });
            }
        }
        Ok(())
    }

    fn check_executor_capacity(
        &self,
        candidate: &PathwayDescriptor,
        live: Option<&PathwayDescriptor>,
    ) -> Result<Option<Advisory>, Rejection> {
        let Some(live) = live else {
            return Ok(None);
        };
        let live_size = live.executor().max_message_size();
        let candidate_size = candidate.executor().max_message_size();
        if candidate_size >= live_size {
            return Ok(None);
        }
        if self.policy.allow_shrink {
            Ok(Some(Advisory::ExecutorCapacityShrink {
                key: candidate.key(),
                live: live_size,
                candidate: candidate_size,
            }))
        } else {
            Err(Rejection::ExecutorCapacityShrink {
                live: live_size,
                candidate: candidate_size,
            })
        }
    }
}

/// First-time setup counts as a library change.
fn check_grace_period(
    candidate: &PathwayDescriptor,
    live: Option<&PathwayDescriptor>,
) -> Option<Advisory> {
    let library_changes = live.is_none_or(|l| candidate.library().libraries_differ(l.library()));
    if library_changes && candidate.library().grace_period == 0 {
        Some(Advisory::GracePeriodWarning {
            key: candidate.key(),
        })
    } else {
        None
    }
}

/// Validation outcomes for every created or updated pathway.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    outcomes: BTreeMap<PathwayKey, ValidationOutcome>,
}

impl ValidationReport {
    /// Record an outcome.
    pub fn insert(&mut self, key: PathwayKey, outcome: ValidationOutcome) {
        self.outcomes.insert(key, outcome);
    }

    /// Outcome for a pathway.
    pub fn get(&self, key: &PathwayKey) -> Option<&ValidationOutcome> {
        self.outcomes.get(key)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathwayKey, &ValidationOutcome)> {
        self.outcomes.iter()
    }

    /// Pathways that were rejected.
    pub fn rejected(&self) -> impl Iterator<Item = (&PathwayKey, &Rejection)> {
        self.outcomes.iter().filter_map(|(k, o)| match o {
            ValidationOutcome::Rejected(r) => Some((k, r)),
            _ => None,
        })
    }

    /// All advisories across pathways.
    pub fn advisories(&self) -> Vec<&Advisory> {
        self.outcomes.values().flat_map(|o| o.advisories()).collect()
    }

    /// True when nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected().next().is_none()
    }

    /// Number of validated pathways.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True when nothing was validated.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
