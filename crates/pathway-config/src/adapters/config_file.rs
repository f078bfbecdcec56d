//! Wiring Configuration File
//!
//! JSON loader for the declarative pathway configuration, and export/import
//! of live-state snapshots in the same `connections` shape.
//!
//! ```json
//! {
//!   "contracts": [{ "eid": 40217, "contractName": "thUSD" }],
//!   "connections": [{ "from": 40217, "to": 40161, "config": { ... } }]
//! }
//! ```

use crate::domain::{
    build_pathway, Address, ConfigurationSet, EndpointId, EndpointRegistry, ExecutorPolicy,
    LibraryBinding, LiveState, PathwayDescriptor, PathwayError, ReceiveVerification,
    RegistryError, SendVerification, ValidationError, VerificationAgentSet, VerificationPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Loader failures.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// File could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON or wrong shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Connection references an unregistered endpoint.
    #[error("Connection {index}: {source}")]
    Registry {
        index: usize,
        #[source]
        source: RegistryError,
    },

    /// Connection fails structural checks.
    #[error("Connection {index} ({from}->{to}): {source}")]
    Invalid {
        index: usize,
        from: EndpointId,
        to: EndpointId,
        #[source]
        source: ValidationError,
    },

    /// Two connections for the same directed pair.
    #[error(transparent)]
    Set(#[from] PathwayError),
}

impl From<ConfigFileError> for PathwayError {
    fn from(err: ConfigFileError) -> Self {
        match err {
            ConfigFileError::Registry { source, .. } => PathwayError::Registry(source),
            ConfigFileError::Invalid { source, .. } => PathwayError::Validation(source),
            ConfigFileError::Set(inner) => inner,
            other => PathwayError::Config(other.to_string()),
        }
    }
}

/// Top-level wiring document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiringFile {
    /// Contract deployed on each endpoint.
    #[serde(default)]
    pub contracts: Vec<ContractEntry>,
    /// Directed pathway entries.
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
}

/// Contract name deployed on an endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEntry {
    pub eid: EndpointId,
    pub contract_name: String,
}

/// One directed pathway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub from: EndpointId,
    pub to: EndpointId,
    pub config: ConnectionConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub send_library: Address,
    pub receive_library_config: ReceiveLibraryConfig,
    pub send_config: SendConfig,
    pub receive_config: ReceiveConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveLibraryConfig {
    pub receive_library: Address,
    #[serde(default)]
    pub grace_period: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendConfig {
    pub executor_config: ExecutorConfig,
    pub uln_config: UlnConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveConfig {
    pub uln_config: UlnConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorConfig {
    pub max_message_size: u32,
    pub executor: Address,
}

/// Confirmations and verifier (DVN) sets for one direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlnConfig {
    pub confirmations: u64,
    #[serde(rename = "requiredDVNs", default)]
    pub required_dvns: Vec<Address>,
    #[serde(rename = "optionalDVNs", default)]
    pub optional_dvns: Vec<Address>,
    #[serde(rename = "optionalDVNThreshold", default)]
    pub optional_dvn_threshold: u8,
}

impl UlnConfig {
    fn to_policy(&self) -> Result<VerificationPolicy, ValidationError> {
        let agents = VerificationAgentSet::new(
            self.required_dvns.clone(),
            self.optional_dvns.clone(),
            self.optional_dvn_threshold,
        )?;
        Ok(VerificationPolicy::new(self.confirmations, agents))
    }

    fn from_policy(policy: &VerificationPolicy) -> Self {
        Self {
            confirmations: policy.confirmations.confirmations,
            required_dvns: policy.agents.required().iter().copied().collect(),
            optional_dvns: policy.agents.optional().iter().copied().collect(),
            optional_dvn_threshold: policy.agents.optional_threshold(),
        }
    }
}

impl ConnectionEntry {
    /// Resolve endpoints and build the descriptor.
    pub fn to_descriptor(
        &self,
        index: usize,
        registry: &EndpointRegistry,
    ) -> Result<PathwayDescriptor, ConfigFileError> {
        let resolve = |id: EndpointId| {
            registry
                .resolve(id)
                .map_err(|source| ConfigFileError::Registry { index, source })
        };
        let invalid = |source: ValidationError| ConfigFileError::Invalid {
            index,
            from: self.from,
            to: self.to,
            source,
        };

        let config = &self.config;
        let executor = ExecutorPolicy::new(
            config.send_config.executor_config.executor,
            config.send_config.executor_config.max_message_size,
        )
        .map_err(invalid)?;
        let send = config.send_config.uln_config.to_policy().map_err(invalid)?;
        let receive = config.receive_config.uln_config.to_policy().map_err(invalid)?;

        build_pathway(
            resolve(self.from)?,
            resolve(self.to)?,
            LibraryBinding::new(
                config.send_library,
                config.receive_library_config.receive_library,
                config.receive_library_config.grace_period,
            ),
            SendVerification(send),
            ReceiveVerification(receive),
            executor,
        )
        .map_err(invalid)
    }

    /// Entry describing an existing descriptor.
    pub fn from_descriptor(descriptor: &PathwayDescriptor) -> Self {
        let library = descriptor.library();
        Self {
            from: descriptor.from().id,
            to: descriptor.to().id,
            config: ConnectionConfig {
                send_library: library.send_library,
                receive_library_config: ReceiveLibraryConfig {
                    receive_library: library.receive_library,
                    grace_period: library.grace_period,
                },
                send_config: SendConfig {
                    executor_config: ExecutorConfig {
                        max_message_size: descriptor.executor().max_message_size(),
                        executor: descriptor.executor().executor(),
                    },
                    uln_config: UlnConfig::from_policy(descriptor.send().policy()),
                },
                receive_config: ReceiveConfig {
                    uln_config: UlnConfig::from_policy(descriptor.receive().policy()),
                },
            },
        }
    }
}

impl WiringFile {
    /// Parse a wiring document.
    pub fn parse(raw: &str) -> Result<Self, ConfigFileError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read and parse a wiring document.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Write as pretty JSON.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ConfigFileError> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(|source| ConfigFileError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Build every descriptor, in file order.
    pub fn descriptors(
        &self,
        registry: &EndpointRegistry,
    ) -> Result<Vec<PathwayDescriptor>, ConfigFileError> {
        self.connections
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.to_descriptor(index, registry))
            .collect()
    }

    /// Target configuration set.
    pub fn configuration_set(
        &self,
        registry: &EndpointRegistry,
    ) -> Result<ConfigurationSet, ConfigFileError> {
        let set = ConfigurationSet::new(self.descriptors(registry)?)?;
        info!(pathways = set.len(), contracts = self.contracts.len(), "Loaded wiring configuration");
        Ok(set)
    }

    /// Live state snapshot. Later entries replace earlier ones per key.
    pub fn live_state(&self, registry: &EndpointRegistry) -> Result<LiveState, ConfigFileError> {
        Ok(LiveState::from_descriptors(self.descriptors(registry)?))
    }

    /// Document describing a live state.
    pub fn from_live(live: &LiveState) -> Self {
        Self {
            contracts: Vec::new(),
            connections: live
                .iter()
                .map(|(_, descriptor)| ConnectionEntry::from_descriptor(descriptor))
                .collect(),
        }
    }

    /// Contract name on an endpoint, if listed.
    pub fn contract_name(&self, eid: EndpointId) -> Option<&str> {
        self.contracts
            .iter()
            .find(|c| c.eid == eid)
            .map(|c| c.contract_name.as_str())
    }
}
