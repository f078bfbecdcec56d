//! # Endpoint Identity Registry
//!
//! Single source of truth mapping endpoint ids to deployed endpoints.

use super::entities::Endpoint;
use super::errors::RegistryError;
use super::value_objects::{Address, EndpointId};
use crate::ports::outbound::DeploymentProvider;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of known endpoints.
#[derive(Clone, Debug, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<EndpointId, Arc<Endpoint>>,
}

impl EndpointRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate from a deployment provider. Its output is authoritative for
    /// the session.
    pub fn from_provider(provider: &dyn DeploymentProvider) -> Result<Self, crate::PathwayError> {
        let mut registry = Self::new();
        for (id, address) in provider.deployments()? {
            registry.register(id, address)?;
        }
        info!(endpoints = registry.len(), "Endpoint registry populated");
        Ok(registry)
    }

    /// Register an endpoint. Idempotent for the same address.
    pub fn register(&mut self, id: EndpointId, transport_address: Address) -> Result<(), RegistryError> {
        if let Some(existing) = self.endpoints.get(&id) {
            if existing.transport_address == transport_address {
                return Ok(());
            }
            return Err(RegistryError::DuplicateEndpoint {
                id,
                existing: existing.transport_address,
                attempted: transport_address,
            });
        }
        debug!(endpoint = %id, address = %transport_address, "Registered endpoint");
        self.endpoints
            .insert(id, Arc::new(Endpoint::new(id, transport_address)));
        Ok(())
    }

    /// Resolve an endpoint by id.
    pub fn resolve(&self, id: EndpointId) -> Result<Arc<Endpoint>, RegistryError> {
        self.endpoints
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownEndpoint(id))
    }

    /// Replace an endpoint's address after a redeployment.
    ///
    /// Descriptors built earlier keep the old endpoint, so they diff as
    /// changed against descriptors resolved afterwards.
    pub fn rotate(&mut self, id: EndpointId, new_address: Address) -> Result<(), RegistryError> {
        let slot = self
            .endpoints
            .get_mut(&id)
            .ok_or(RegistryError::UnknownEndpoint(id))?;
        info!(endpoint = %id, old = %slot.transport_address, new = %new_address, "Rotating endpoint address");
        *slot = Arc::new(Endpoint::new(id, new_address));
        Ok(())
    }

    /// True if the id is registered.
    pub fn contains(&self, id: EndpointId) -> bool {
        self.endpoints.contains_key(&id)
    }

    /// Registered ids in order.
    pub fn ids(&self) -> impl Iterator<Item = EndpointId> + '_ {
        self.endpoints.keys().copied()
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
