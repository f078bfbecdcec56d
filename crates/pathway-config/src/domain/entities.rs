//! # Domain Entities
//!
//! Endpoints, pathway descriptors and the collections the reconciliation
//! engine works over.

use super::errors::{ApplyFailure, PathwayError, ValidationError};
use super::invariants::{check_structure, invariant_no_self_loop};
use super::value_objects::{
    Address, Direction, EndpointId, ExecutorPolicy, LibraryBinding, PathwayKey,
    ReceiveVerification, SendVerification, VerificationPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::sync::Arc;

/// Messaging endpoint deployed on one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Chain identifier.
    pub id: EndpointId,
    /// Address of the messaging endpoint contract.
    pub transport_address: Address,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(id: EndpointId, transport_address: Address) -> Self {
        Self {
            id,
            transport_address,
        }
    }
}

/// One directed messaging edge and the security stack governing it.
///
/// Only [`build_pathway`] constructs descriptors, so every instance satisfies
/// the structural invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathwayDescriptor {
    from: Arc<Endpoint>,
    to: Arc<Endpoint>,
    library: LibraryBinding,
    send: SendVerification,
    receive: ReceiveVerification,
    executor: ExecutorPolicy,
}

/// Build a pathway descriptor, checking structural invariants eagerly.
pub fn build_pathway(
    from: Arc<Endpoint>,
    to: Arc<Endpoint>,
    library: LibraryBinding,
    send: SendVerification,
    receive: ReceiveVerification,
    executor: ExecutorPolicy,
) -> Result<PathwayDescriptor, ValidationError> {
    invariant_no_self_loop(from.id, to.id)?;
    let descriptor = PathwayDescriptor {
        from,
        to,
        library,
        send,
        receive,
        executor,
    };
    check_structure(&descriptor)?;
    Ok(descriptor)
}

impl PathwayDescriptor {
    /// Unique key of this pathway.
    pub fn key(&self) -> PathwayKey {
        PathwayKey::new(self.from.id, self.to.id)
    }

    /// Source endpoint.
    pub fn from(&self) -> &Arc<Endpoint> {
        &self.from
    }

    /// Destination endpoint.
    pub fn to(&self) -> &Arc<Endpoint> {
        &self.to
    }

    /// Library binding.
    pub fn library(&self) -> &LibraryBinding {
        &self.library
    }

    /// Send-side verification.
    pub fn send(&self) -> &SendVerification {
        &self.send
    }

    /// Receive-side verification.
    pub fn receive(&self) -> &ReceiveVerification {
        &self.receive
    }

    /// Executor policy.
    pub fn executor(&self) -> &ExecutorPolicy {
        &self.executor
    }

    /// True when both describe the same pathway with the same enforced
    /// fields. Endpoint transport addresses are not compared.
    pub fn same_configuration(&self, other: &PathwayDescriptor) -> bool {
        self.key() == other.key()
            && self.library == other.library
            && self.send == other.send
            && self.receive == other.receive
            && self.executor == other.executor
    }

    /// Verification policy for a direction.
    pub fn verification(&self, direction: Direction) -> &VerificationPolicy {
        match direction {
            Direction::Send => self.send.policy(),
            Direction::Receive => self.receive.policy(),
        }
    }
}

/// Desired global state: at most one descriptor per directed pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationSet {
    pathways: BTreeMap<PathwayKey, PathwayDescriptor>,
}

impl ConfigurationSet {
    /// Build a set, failing on a repeated `(from, to)` pair.
    pub fn new(descriptors: Vec<PathwayDescriptor>) -> Result<Self, PathwayError> {
        let mut pathways = BTreeMap::new();
        for descriptor in descriptors {
            match pathways.entry(descriptor.key()) {
                btree_map::Entry::Occupied(entry) => {
                    return Err(PathwayError::DuplicatePathway(*entry.key()));
                }
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(descriptor);
                }
            }
        }
        Ok(Self { pathways })
    }

    /// Descriptor for a key.
    pub fn get(&self, key: &PathwayKey) -> Option<&PathwayDescriptor> {
        self.pathways.get(key)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathwayKey, &PathwayDescriptor)> {
        self.pathways.iter()
    }

    /// Number of pathways.
    pub fn len(&self) -> usize {
        self.pathways.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }
}

/// Configuration currently enforced by the endpoint. A missing key means the
/// pathway is unconfigured or only partially configured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveState {
    pathways: BTreeMap<PathwayKey, PathwayDescriptor>,
}

impl LiveState {
    /// Empty live state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from descriptors; later entries replace earlier ones per key.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = PathwayDescriptor>) -> Self {
        let mut state = Self::new();
        for descriptor in descriptors {
            state.insert(descriptor);
        }
        state
    }

    /// Record a descriptor, returning the one it replaces.
    pub fn insert(&mut self, descriptor: PathwayDescriptor) -> Option<PathwayDescriptor> {
        self.pathways.insert(descriptor.key(), descriptor)
    }

    /// Forget a pathway (its state became unknown).
    pub fn remove(&mut self, key: &PathwayKey) -> Option<PathwayDescriptor> {
        self.pathways.remove(key)
    }

    /// Descriptor for a key.
    pub fn get(&self, key: &PathwayKey) -> Option<&PathwayDescriptor> {
        self.pathways.get(key)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathwayKey, &PathwayDescriptor)> {
        self.pathways.iter()
    }

    /// Number of configured pathways.
    pub fn len(&self) -> usize {
        self.pathways.len()
    }

    /// True when nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }
}

/// Phase of an apply, in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApplyPhase {
    /// Send and receive library bindings.
    Library,
    /// Receive-side verification policy.
    ReceiveVerification,
    /// Send-side verification policy.
    SendVerification,
    /// Executor policy.
    Executor,
}

/// Single on-chain configuration change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Set the send library.
    SendLibrary(Address),
    /// Set the receive library and the grace period for the previous one.
    ReceiveLibrary {
        /// New receive library.
        library: Address,
        /// Seconds the previous library stays valid.
        grace_period: u64,
    },
    /// Set receive-side confirmations and agents.
    ReceiveVerification(ReceiveVerification),
    /// Set send-side confirmations and agents.
    SendVerification(SendVerification),
    /// Set the executor.
    Executor(ExecutorPolicy),
}

impl FieldUpdate {
    /// Phase this update belongs to.
    pub fn phase(&self) -> ApplyPhase {
        match self {
            FieldUpdate::SendLibrary(_) | FieldUpdate::ReceiveLibrary { .. } => ApplyPhase::Library,
            FieldUpdate::ReceiveVerification(_) => ApplyPhase::ReceiveVerification,
            FieldUpdate::SendVerification(_) => ApplyPhase::SendVerification,
            FieldUpdate::Executor(_) => ApplyPhase::Executor,
        }
    }
}

/// Whether an instruction creates or updates a pathway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionKind {
    /// Pathway absent from live state.
    Create,
    /// Pathway present but different.
    Update,
}

/// Ordered updates for one pathway, handed to the transaction submitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyInstruction {
    /// Target pathway.
    pub key: PathwayKey,
    /// Create or update.
    pub kind: InstructionKind,
    updates: Vec<FieldUpdate>,
}

impl ApplyInstruction {
    /// Create an instruction; updates are ordered by [`ApplyPhase`].
    pub fn new(key: PathwayKey, kind: InstructionKind, mut updates: Vec<FieldUpdate>) -> Self {
        updates.sort_by_key(FieldUpdate::phase);
        Self { key, kind, updates }
    }

    /// Updates in submission order.
    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }
}

/// Outcome of applying one pathway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyResult {
    /// Submitted and confirmed.
    Applied,
    /// Nothing submitted (unchanged, or batch aborted).
    Skipped,
    /// Not applied, or applied with unknown outcome.
    Failed(ApplyFailure),
}

impl ApplyResult {
    /// True for [`ApplyResult::Failed`].
    pub fn is_failed(&self) -> bool {
        matches!(self, ApplyResult::Failed(_))
    }
}
