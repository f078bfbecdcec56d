//! # Adapters
//!
//! Implementations of the outbound ports.

pub mod config_file;
pub mod deployment;
pub mod endpoint_config;

pub use config_file::{ConfigFileError, ConnectionEntry, ContractEntry, WiringFile};
pub use deployment::{HardhatDeploymentProvider, NetworkTable, StaticDeploymentProvider};
pub use endpoint_config::InMemoryEndpointConfig;
