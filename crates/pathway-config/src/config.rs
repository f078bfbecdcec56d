//! # Reconciler Configuration
//!
//! Defaults with environment overrides.
//!
//! ## Environment Variables
//!
//! - `PW_APPLY_TIMEOUT_SECS`: Per-pathway confirmation timeout (default: 120)
//! - `PW_MIN_REQUIRED_AGENTS`: Required-agent floor per direction (default: 1)
//! - `PW_ALLOW_SHRINK`: Permit executor max message size shrink (default: false)
//! - `PW_APPLY_MODE`: `all-or-nothing` or `partial` (default: all-or-nothing)

use crate::algorithms::SecurityPolicy;
use crate::domain::ApplyMode;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Reconciler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Seconds to wait for each pathway's confirmation.
    pub apply_timeout_secs: u64,
    /// Validator policy.
    pub security: SecurityPolicy,
    /// Mode used when the caller does not pick one.
    pub default_mode: ApplyMode,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            apply_timeout_secs: 120,
            security: SecurityPolicy::default(),
            default_mode: ApplyMode::AllOrNothing,
        }
    }
}

impl ReconcilerConfig {
    /// Defaults overlaid with `PW_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|name| env::var(name).ok())
    }

    /// Overlay values from a lookup; unparsable values keep the default.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secs) = parse_var(&lookup, "PW_APPLY_TIMEOUT_SECS") {
            self.apply_timeout_secs = secs;
        }
        if let Some(floor) = parse_var(&lookup, "PW_MIN_REQUIRED_AGENTS") {
            if floor == 0 {
                warn!("PW_MIN_REQUIRED_AGENTS=0 permits pathways without required verifiers");
            }
            self.security.min_required_agents = floor;
        }
        if let Some(v) = lookup("PW_ALLOW_SHRINK") {
            self.security.allow_shrink = v.to_lowercase() == "true" || v == "1";
        }
        if let Some(mode) = parse_var(&lookup, "PW_APPLY_MODE") {
            self.default_mode = mode;
        }
        self
    }

    /// Timeout as a duration.
    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}
