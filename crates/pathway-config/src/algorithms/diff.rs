//! # Configuration Diff
//!
//! Computes the minimal transitions from live state to a target
//! configuration set and turns them into ordered apply instructions.

use crate::domain::{
    ApplyInstruction, ConfigurationSet, FieldUpdate, InstructionKind, LiveState,
    PathwayDescriptor, PathwayKey,
};

/// Live descriptor and the target replacing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathwayUpdate {
    /// Currently enforced descriptor.
    pub live: PathwayDescriptor,
    /// Desired descriptor.
    pub target: PathwayDescriptor,
}

/// Difference between live state and a target set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationDiff {
    /// Target pathways missing from live state.
    pub creates: Vec<PathwayDescriptor>,
    /// Pathways whose descriptors differ.
    pub updates: Vec<PathwayUpdate>,
    /// Pathways already matching the target.
    pub unchanged: Vec<PathwayKey>,
    /// Live pathways the target does not mention. Never modified.
    pub untracked: Vec<PathwayKey>,
}

impl ConfigurationDiff {
    /// True when nothing needs to be created or updated.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }

    /// Number of creates plus updates.
    pub fn change_count(&self) -> usize {
        self.creates.len() + self.updates.len()
    }
}

/// Compute the diff. Pure; output is in key order.
pub fn diff(live: &LiveState, target: &ConfigurationSet) -> ConfigurationDiff {
    let mut result = ConfigurationDiff::default();

    for (key, desired) in target.iter() {
        match live.get(key) {
            None => result.creates.push(desired.clone()),
            Some(current) if current.same_configuration(desired) => result.unchanged.push(*key),
            Some(current) => result.updates.push(PathwayUpdate {
                live: current.clone(),
                target: desired.clone(),
            }),
        }
    }

    result.untracked = live
        .iter()
        .map(|(key, _)| *key)
        .filter(|key| target.get(key).is_none())
        .collect();

    result
}

/// Every field of a new pathway.
pub fn create_instruction(target: &PathwayDescriptor) -> ApplyInstruction {
    let library = target.library();
    ApplyInstruction::new(
        target.key(),
        InstructionKind::Create,
        vec![
            FieldUpdate::SendLibrary(library.send_library),
            FieldUpdate::ReceiveLibrary {
                library: library.receive_library,
                grace_period: library.grace_period,
            },
            FieldUpdate::ReceiveVerification(target.receive().clone()),
            FieldUpdate::SendVerification(target.send().clone()),
            FieldUpdate::Executor(*target.executor()),
        ],
    )
}

/// Only the fields that differ between `live` and `target`.
pub fn update_instruction(live: &PathwayDescriptor, target: &PathwayDescriptor) -> ApplyInstruction {
    let mut updates = Vec::new();
    let (old_lib, new_lib) = (live.library(), target.library());

    if old_lib.send_library != new_lib.send_library {
        updates.push(FieldUpdate::SendLibrary(new_lib.send_library));
    }
    if old_lib.receive_library != new_lib.receive_library
        || old_lib.grace_period != new_lib.grace_period
    {
        updates.push(FieldUpdate::ReceiveLibrary {
            library: new_lib.receive_library,
            grace_period: new_lib.grace_period,
        });
    }
    if live.receive() != target.receive() {
        updates.push(FieldUpdate::ReceiveVerification(target.receive().clone()));
    }
    if live.send() != target.send() {
        updates.push(FieldUpdate::SendVerification(target.send().clone()));
    }
    if live.executor() != target.executor() {
        updates.push(FieldUpdate::Executor(*target.executor()));
    }

    ApplyInstruction::new(target.key(), InstructionKind::Update, updates)
}
