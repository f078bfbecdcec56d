//! In-Memory Endpoint Configuration
//!
//! Simulates an endpoint's on-chain pathway configuration. Implements both
//! `TransactionSubmitter` and `LiveStateSource`.

use crate::domain::{
    build_pathway, Address, ApplyInstruction, ApplyPhase, EndpointRegistry, ExecutorPolicy,
    FieldUpdate, LibraryBinding, LiveState, PathwayDescriptor, PathwayError, PathwayKey,
    ReceiveVerification, SendVerification,
};
use crate::ports::outbound::{LiveStateSource, SubmitError, TransactionSubmitter};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Field-level state of one pathway. Fields are written independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct PathwayFields {
    send_library: Option<Address>,
    receive_library: Option<(Address, u64)>,
    receive: Option<ReceiveVerification>,
    send: Option<SendVerification>,
    executor: Option<ExecutorPolicy>,
}

impl PathwayFields {
    fn write(&mut self, update: &FieldUpdate) {
        match update {
            FieldUpdate::SendLibrary(library) => self.send_library = Some(*library),
            FieldUpdate::ReceiveLibrary {
                library,
                grace_period,
            } => self.receive_library = Some((*library, *grace_period)),
            FieldUpdate::ReceiveVerification(policy) => self.receive = Some(policy.clone()),
            FieldUpdate::SendVerification(policy) => self.send = Some(policy.clone()),
            FieldUpdate::Executor(executor) => self.executor = Some(*executor),
        }
    }

    fn from_descriptor(descriptor: &PathwayDescriptor) -> Self {
        let library = descriptor.library();
        Self {
            send_library: Some(library.send_library),
            receive_library: Some((library.receive_library, library.grace_period)),
            receive: Some(descriptor.receive().clone()),
            send: Some(descriptor.send().clone()),
            executor: Some(*descriptor.executor()),
        }
    }
}

/// In-memory endpoint with fault injection.
pub struct InMemoryEndpointConfig {
    registry: EndpointRegistry,
    pathways: RwLock<BTreeMap<PathwayKey, PathwayFields>>,
    /// Keys whose submissions revert.
    failing: RwLock<HashSet<PathwayKey>>,
    /// Keys whose submissions write the first update, then never confirm.
    stalled: RwLock<HashSet<PathwayKey>>,
    writes: Mutex<Vec<(PathwayKey, ApplyPhase)>>,
}

impl InMemoryEndpointConfig {
    /// Empty endpoint configuration resolving endpoints through `registry`.
    pub fn new(registry: EndpointRegistry) -> Self {
        Self {
            registry,
            pathways: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(HashSet::new()),
            stalled: RwLock::new(HashSet::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Preload live state.
    pub fn with_live(registry: EndpointRegistry, live: &LiveState) -> Self {
        let config = Self::new(registry);
        {
            let mut pathways = config.pathways.write();
            for (key, descriptor) in live.iter() {
                pathways.insert(*key, PathwayFields::from_descriptor(descriptor));
            }
        }
        config
    }

    /// Make submissions for `key` revert.
    pub fn fail_on(&self, key: PathwayKey) {
        self.failing.write().insert(key);
    }

    /// Make submissions for `key` hang after the first write.
    pub fn stall_on(&self, key: PathwayKey) {
        self.stalled.write().insert(key);
    }

    /// Clear fault injection.
    pub fn clear_faults(&self) {
        self.failing.write().clear();
        self.stalled.write().clear();
    }

    /// Every field write in order.
    pub fn writes(&self) -> Vec<(PathwayKey, ApplyPhase)> {
        self.writes.lock().clone()
    }

    /// Registry used to resolve endpoints.
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Fully configured pathways. Half-written pathways are absent.
    pub fn snapshot(&self) -> LiveState {
        let pathways = self.pathways.read();
        let mut live = LiveState::new();
        for (key, fields) in pathways.iter() {
            match self.assemble(key, fields) {
                Some(descriptor) => {
                    live.insert(descriptor);
                }
                None => debug!(pathway = %key, "Pathway not fully configured"),
            }
        }
        live
    }

    fn assemble(&self, key: &PathwayKey, fields: &PathwayFields) -> Option<PathwayDescriptor> {
        let send_library = fields.send_library?;
        let (receive_library, grace_period) = fields.receive_library?;
        let from = self.registry.resolve(key.from).ok()?;
        let to = self.registry.resolve(key.to).ok()?;
        match build_pathway(
            from,
            to,
            LibraryBinding::new(send_library, receive_library, grace_period),
            fields.send.clone()?,
            fields.receive.clone()?,
            fields.executor?,
        ) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!(pathway = %key, error = %e, "Stored pathway is invalid");
                None
            }
        }
    }

    fn write(&self, key: PathwayKey, update: &FieldUpdate) {
        self.pathways.write().entry(key).or_default().write(update);
        self.writes.lock().push((key, update.phase()));
    }
}

#[async_trait]
impl TransactionSubmitter for InMemoryEndpointConfig {
    async fn submit(&self, instruction: &ApplyInstruction) -> Result<(), SubmitError> {
        let key = instruction.key;
        if self.failing.read().contains(&key) {
            return Err(SubmitError::Reverted(format!("injected failure on {key}")));
        }

        if self.stalled.read().contains(&key) {
            if let Some(first) = instruction.updates().first() {
                self.write(key, first);
            }
            std::future::pending::<()>().await;
        }

        for update in instruction.updates() {
            self.write(key, update);
        }
        debug!(pathway = %key, updates = instruction.updates().len(), "Instruction confirmed");
        Ok(())
    }
}

#[async_trait]
impl LiveStateSource for InMemoryEndpointConfig {
    async fn live_state(&self) -> Result<LiveState, PathwayError> {
        Ok(self.snapshot())
    }
}
