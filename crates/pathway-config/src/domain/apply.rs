//! # Apply Options and Reports

use super::entities::ApplyResult;
use super::errors::Advisory;
use super::value_objects::PathwayKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How a batch reacts to blocked pathways.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    /// Any blocked pathway aborts the whole batch before submission.
    #[default]
    AllOrNothing,
    /// Blocked pathways fail individually; the rest are submitted.
    Partial,
}

impl FromStr for ApplyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all-or-nothing" | "atomic" => Ok(Self::AllOrNothing),
            "partial" => Ok(Self::Partial),
            other => Err(format!("unknown apply mode: {other}")),
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllOrNothing => write!(f, "all-or-nothing"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Which advisory findings the operator has confirmed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Nothing acknowledged.
    #[default]
    None,
    /// Every advisory in the batch.
    All,
    /// Advisories on the listed pathways only.
    Pathways(HashSet<PathwayKey>),
}

impl Acknowledgement {
    /// True if advisories on `key` may proceed.
    pub fn covers(&self, key: &PathwayKey) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Pathways(keys) => keys.contains(key),
        }
    }

    /// Advisories on `key` still awaiting confirmation.
    pub fn pending(&self, key: &PathwayKey, advisories: &[Advisory]) -> Vec<Advisory> {
        if self.covers(key) {
            Vec::new()
        } else {
            advisories.to_vec()
        }
    }
}

/// Options for one apply call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// How a blocked or failed pathway affects the rest of the batch.
    pub mode: ApplyMode,
    /// Advisories the caller accepts.
    pub acknowledgement: Acknowledgement,
    /// Per-pathway confirmation timeout; the service default when unset.
    pub timeout: Option<Duration>,
}

impl ApplyOptions {
    /// All-or-nothing with every advisory acknowledged.
    pub fn acknowledged() -> Self {
        Self {
            mode: ApplyMode::AllOrNothing,
            acknowledgement: Acknowledgement::All,
            timeout: None,
        }
    }

    /// Builder: set the mode.
    pub fn with_mode(mut self, mode: ApplyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder: set the acknowledgement.
    pub fn with_acknowledgement(mut self, acknowledgement: Acknowledgement) -> Self {
        self.acknowledgement = acknowledgement;
        self
    }

    /// Builder: set the confirmation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Outcome of a successful apply call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Result for every pathway in the target set.
    pub results: BTreeMap<PathwayKey, ApplyResult>,
    /// A submission ended in unknown state; diff again before trusting live state.
    pub requires_rediff: bool,
}

impl ApplyReport {
    /// Keys that were applied.
    pub fn applied(&self) -> Vec<PathwayKey> {
        self.keys_where(|r| matches!(r, ApplyResult::Applied))
    }

    /// Keys that failed.
    pub fn failed(&self) -> Vec<PathwayKey> {
        self.keys_where(ApplyResult::is_failed)
    }

    /// Keys that were skipped.
    pub fn skipped(&self) -> Vec<PathwayKey> {
        self.keys_where(|r| matches!(r, ApplyResult::Skipped))
    }

    fn keys_where(&self, pred: impl Fn(&ApplyResult) -> bool) -> Vec<PathwayKey> {
        self.results
            .iter()
            .filter(|(_, result)| pred(result))
            .map(|(key, _)| *key)
            .collect()
    }
}
