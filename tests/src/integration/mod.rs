//! # Integration Tests
//!
//! Everything here drives the public API only.

pub mod concurrency;
pub mod properties;
pub mod scenarios;
