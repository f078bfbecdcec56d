//! # Domain Invariants
//!
//! Structural rules every pathway descriptor satisfies. Constructors call
//! these eagerly; the security stack validator re-runs them.

use super::entities::PathwayDescriptor;
use super::errors::ValidationError;
use super::value_objects::{Address, EndpointId};
use std::collections::BTreeSet;

/// Default minimum number of required verification agents per direction.
pub const DEFAULT_MIN_REQUIRED_AGENTS: usize = 1;

/// Invariant: a pathway never targets itself.
pub fn invariant_no_self_loop(from: EndpointId, to: EndpointId) -> Result<(), ValidationError> {
    if from == to {
        return Err(ValidationError::SelfLoop(from));
    }
    Ok(())
}

/// Invariant: `required ∩ optional = ∅`.
pub fn invariant_agents_disjoint(
    required: &BTreeSet<Address>,
    optional: &BTreeSet<Address>,
) -> Result<(), ValidationError> {
    match required.intersection(optional).next() {
        Some(agent) => Err(ValidationError::AgentSetOverlap(*agent)),
        None => Ok(()),
    }
}

/// Invariant: `0 <= optional_threshold <= |optional|`.
pub fn invariant_threshold(threshold: u8, optional_len: usize) -> Result<(), ValidationError> {
    if threshold as usize > optional_len {
        return Err(ValidationError::ThresholdOutOfRange {
            threshold,
            optional: optional_len,
        });
    }
    Ok(())
}

/// Invariant: executor message size is positive.
pub fn invariant_message_size(max_message_size: u32) -> Result<(), ValidationError> {
    if max_message_size == 0 {
        return Err(ValidationError::NonPositiveMessageSize);
    }
    Ok(())
}

/// All structural invariants of a descriptor.
pub fn check_structure(descriptor: &PathwayDescriptor) -> Result<(), ValidationError> {
    invariant_no_self_loop(descriptor.from().id, descriptor.to().id)?;
    descriptor.send().policy().agents.check()?;
    descriptor.receive().policy().agents.check()?;
    invariant_message_size(descriptor.executor().max_message_size())
}
