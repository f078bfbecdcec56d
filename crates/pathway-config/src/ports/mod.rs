//! # Ports Module
//!
//! Hexagonal architecture ports (inbound API + outbound collaborators).

pub mod inbound;
pub mod outbound;

pub use inbound::PathwayConfigApi;
pub use outbound::{
    DeploymentProvider, LiveStateSource, RecordingSubmitter, SubmitError, TransactionSubmitter,
};
