//! # Algorithms Module
//!
//! Security stack validation, configuration diff and apply planning.

pub mod diff;
pub mod plan;
pub mod validator;

pub use diff::{create_instruction, diff, update_instruction, ConfigurationDiff, PathwayUpdate};
pub use plan::{ApplyBatch, PlannedPathway};
pub use validator::{SecurityPolicy, SecurityStackValidator, ValidationOutcome, ValidationReport};
