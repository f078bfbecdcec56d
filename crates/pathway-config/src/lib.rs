//! # Pathway Config
//!
//! Security configuration for cross-chain messaging pathways.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Each directed pathway between two chain endpoints declares its message
//! libraries, verification agents (DVNs), confirmation counts and executor
//! limits. This crate:
//! - resolves endpoints through a single registry
//! - builds descriptors that cannot be structurally invalid
//! - validates candidates against the live configuration
//! - diffs live state against a target and applies the difference in a
//!   fixed, safe order
//!
//! ## Safety Rules
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | One descriptor per `(from, to)` | `ConfigurationSet::new` |
//! | No self-loops, disjoint agent sets, bounded threshold | `build_pathway` |
//! | Required agents never shrink or drop below the floor | `SecurityStackValidator` |
//! | Zero grace period on a library change | advisory, needs acknowledgement |
//! | Executor capacity never shrinks silently | rejected unless `allow_shrink` |
//! | Library, then receive, then send, then executor | `ApplyInstruction` ordering |
//! | One in-flight apply per pathway | `PathwayConfigService` |
//!
//! ## Module Structure
//!
//! ```text
//! pathway-config/
//! ├── domain/          # Endpoint, PathwayDescriptor, registry, errors
//! ├── algorithms/      # validator, diff, apply planning
//! ├── ports/           # PathwayConfigApi, DeploymentProvider, TransactionSubmitter
//! ├── adapters/        # deployment records, wiring file, in-memory endpoint
//! └── service.rs       # apply engine
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    ConfigFileError, HardhatDeploymentProvider, InMemoryEndpointConfig, NetworkTable,
    StaticDeploymentProvider, WiringFile,
};
pub use algorithms::{
    create_instruction, diff, update_instruction, ApplyBatch, ConfigurationDiff, PlannedPathway,
    SecurityPolicy, SecurityStackValidator, ValidationOutcome, ValidationReport,
};
pub use config::ReconcilerConfig;
pub use domain::{
    build_pathway, Acknowledgement, Address, Advisory, ApplyFailure, ApplyInstruction, ApplyMode,
    ApplyOptions, ApplyPhase, ApplyReport, ApplyResult, ConfigurationSet, Direction, Endpoint,
    EndpointId, EndpointRegistry, ExecutorPolicy, FieldUpdate, InstructionKind, LibraryBinding,
    LiveState, PathwayDescriptor, PathwayError, PathwayKey, PathwayResult, ReceiveVerification,
    RegistryError, Rejection, SendVerification, ValidationError, VerificationAgentSet,
    VerificationPolicy, DEFAULT_MIN_REQUIRED_AGENTS,
};
pub use ports::{
    DeploymentProvider, LiveStateSource, PathwayConfigApi, RecordingSubmitter, SubmitError,
    TransactionSubmitter,
};
pub use service::PathwayConfigService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
