//! # Domain Module
//!
//! Core domain types for pathway configuration.

pub mod apply;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod registry;
pub mod value_objects;

pub use apply::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use registry::EndpointRegistry;
pub use value_objects::*;
