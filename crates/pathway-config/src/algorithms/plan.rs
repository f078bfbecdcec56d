//! # Apply Planning
//!
//! Pairs every create/update from a diff with its validation outcome and
//! its ordered apply instruction.

use super::diff::{create_instruction, diff, update_instruction, ConfigurationDiff};
use super::validator::{SecurityStackValidator, ValidationOutcome, ValidationReport};
use crate::domain::{ApplyInstruction, ConfigurationSet, LiveState, PathwayDescriptor, PathwayKey};

/// One pathway scheduled for apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedPathway {
    /// Ordered field updates.
    pub instruction: ApplyInstruction,
    /// Validator verdict.
    pub outcome: ValidationOutcome,
    /// Live descriptor the plan was computed against; `None` for a create.
    pub base: Option<PathwayDescriptor>,
}

impl PlannedPathway {
    /// Pathway key.
    pub fn key(&self) -> PathwayKey {
        self.instruction.key
    }

    /// True when `live` no longer holds the state this entry was planned
    /// against.
    pub fn is_stale(&self, live: &LiveState) -> bool {
        match (&self.base, live.get(&self.key())) {
            (None, None) => false,
            (Some(base), Some(current)) => !base.same_configuration(current),
            _ => true,
        }
    }
}

/// Validated batch ready for the apply engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyBatch {
    /// Creates and updates, in key order.
    pub planned: Vec<PlannedPathway>,
    /// Pathways needing no change.
    pub unchanged: Vec<PathwayKey>,
}

impl ApplyBatch {
    /// Diff, validate and order a target against live state.
    pub fn prepare(
        live: &LiveState,
        target: &ConfigurationSet,
        validator: &SecurityStackValidator,
    ) -> Self {
        Self::from_diff(&diff(live, target), validator)
    }

    /// Build from an existing diff.
    pub fn from_diff(diff: &ConfigurationDiff, validator: &SecurityStackValidator) -> Self {
        let mut planned: Vec<PlannedPathway> = Vec::with_capacity(diff.change_count());

        for target in &diff.creates {
            planned.push(PlannedPathway {
                instruction: create_instruction(target),
                outcome: validator.validate(target, None),
                base: None,
            });
        }
        for update in &diff.updates {
            planned.push(PlannedPathway {
                instruction: update_instruction(&update.live, &update.target),
                outcome: validator.validate(&update.target, Some(&update.live)),
                base: Some(update.live.clone()),
            });
        }
        planned.sort_by_key(PlannedPathway::key);

        Self {
            planned,
            unchanged: diff.unchanged.clone(),
        }
    }

    /// Validation outcomes keyed by pathway.
    pub fn validation_report(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        for entry in &self.planned {
            report.insert(entry.key(), entry.outcome.clone());
        }
        report
    }

    /// True when nothing needs applying.
    pub fn is_empty(&self) -> bool {
        self.planned.is_empty()
    }
}
