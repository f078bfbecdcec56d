//! Deployment Provider Adapters
//!
//! Implements `DeploymentProvider` from an in-memory list or from
//! hardhat-deploy style deployment records on disk.

use crate::domain::{Address, EndpointId, PathwayError};
use crate::ports::outbound::DeploymentProvider;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fixed list of deployments.
#[derive(Clone, Debug, Default)]
pub struct StaticDeploymentProvider {
    deployments: Vec<(EndpointId, Address)>,
}

impl StaticDeploymentProvider {
    /// Create from `(endpoint id, address)` pairs.
    pub fn new(deployments: Vec<(EndpointId, Address)>) -> Self {
        Self { deployments }
    }
}

impl DeploymentProvider for StaticDeploymentProvider {
    fn deployments(&self) -> Result<Vec<(EndpointId, Address)>, PathwayError> {
        Ok(self.deployments.clone())
    }
}

/// Network name to endpoint id mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkTable {
    entries: Vec<(String, EndpointId)>,
}

impl NetworkTable {
    /// Networks the wiring is deployed to.
    pub fn known() -> Self {
        Self {
            entries: vec![
                ("sepolia-testnet".to_string(), EndpointId::SEPOLIA_V2_TESTNET),
                ("holesky-testnet".to_string(), EndpointId::HOLESKY_V2_TESTNET),
                ("eth-mainnet".to_string(), EndpointId::ETHEREUM_V2_MAINNET),
            ],
        }
    }

    /// Custom table.
    pub fn new(entries: Vec<(String, EndpointId)>) -> Self {
        Self { entries }
    }

    /// Endpoint id for a network name.
    pub fn endpoint_id(&self, network: &str) -> Option<EndpointId> {
        self.entries
            .iter()
            .find(|(name, _)| name == network)
            .map(|(_, id)| *id)
    }

    /// Network name for an endpoint id.
    pub fn network(&self, id: EndpointId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, eid)| *eid == id)
            .map(|(name, _)| name.as_str())
    }

    /// All entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, EndpointId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl Default for NetworkTable {
    fn default() -> Self {
        Self::known()
    }
}

#[derive(Deserialize)]
struct DeploymentRecord {
    address: Address,
}

/// Reads `<root>/<network>/<contract>.json` for every known network.
///
/// Networks without a record are skipped.
#[derive(Clone, Debug)]
pub struct HardhatDeploymentProvider {
    root: PathBuf,
    contract: String,
    networks: NetworkTable,
}

impl HardhatDeploymentProvider {
    /// Provider over a deployments directory.
    pub fn new(root: impl Into<PathBuf>, contract: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            contract: contract.into(),
            networks: NetworkTable::known(),
        }
    }

    /// Replace the network table.
    pub fn with_networks(mut self, networks: NetworkTable) -> Self {
        self.networks = networks;
        self
    }

    fn record_path(&self, network: &str) -> PathBuf {
        self.root.join(network).join(format!("{}.json", self.contract))
    }

    fn read_record(path: &Path) -> Result<Address, PathwayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PathwayError::Config(format!("reading {}: {e}", path.display()))
        })?;
        let record: DeploymentRecord = serde_json::from_str(&raw).map_err(|e| {
            PathwayError::Config(format!("parsing {}: {e}", path.display()))
        })?;
        Ok(record.address)
    }
}

impl DeploymentProvider for HardhatDeploymentProvider {
    fn deployments(&self) -> Result<Vec<(EndpointId, Address)>, PathwayError> {
        let mut found = Vec::new();
        for (network, id) in self.networks.iter() {
            let path = self.record_path(network);
            if !path.exists() {
                debug!(network, path = %path.display(), "No deployment record");
                continue;
            }
            let address = Self::read_record(&path)?;
            info!(network, endpoint = %id, %address, contract = %self.contract, "Found deployment");
            found.push((id, address));
        }
        Ok(found)
    }
}
