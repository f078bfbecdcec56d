//! # Domain Value Objects
//!
//! Immutable value types for pathway configuration: endpoint ids, addresses,
//! verification agent sets and the per-direction policies built from them.

use super::errors::ValidationError;
use super::invariants::{invariant_agents_disjoint, invariant_message_size, invariant_threshold};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Messaging-layer endpoint identifier (one per chain deployment).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub u32);

impl EndpointId {
    /// Ethereum mainnet (V2 endpoint).
    pub const ETHEREUM_V2_MAINNET: EndpointId = EndpointId(30101);
    /// Sepolia testnet (V2 endpoint).
    pub const SEPOLIA_V2_TESTNET: EndpointId = EndpointId(40161);
    /// Holesky testnet (V2 endpoint).
    pub const HOLESKY_V2_TESTNET: EndpointId = EndpointId(40217);

    /// Raw numeric id.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Testnet ids live in the 40000 range, mainnet ids in the 30000 range.
    pub fn is_testnet(&self) -> bool {
        (40_000..50_000).contains(&self.0)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 20-byte contract or account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

/// Error parsing an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// Input was not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
    /// Decoded byte length was not 20.
    #[error("address must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Message direction on a pathway, seen from the pathway's own edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `from` acts as the source chain.
    Send,
    /// `to` acts as the destination chain.
    Receive,
}

impl Direction {
    /// Both directions, send first.
    pub fn all() -> [Direction; 2] {
        [Direction::Send, Direction::Receive]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => write!(f, "send"),
            Direction::Receive => write!(f, "receive"),
        }
    }
}

/// Verification agents (DVNs) that attest a message.
///
/// `required` agents must all attest; `optional_threshold` of the
/// `optional` agents must attest on top. Both sets are kept sorted.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct VerificationAgentSet {
    required: BTreeSet<Address>,
    optional: BTreeSet<Address>,
    optional_threshold: u8,
}

impl VerificationAgentSet {
    /// Build an agent set, rejecting duplicates, overlaps and an
    /// out-of-range optional threshold.
    pub fn new(
        required: Vec<Address>,
        optional: Vec<Address>,
        optional_threshold: u8,
    ) -> Result<Self, ValidationError> {
        let required = collect_unique(required)?;
        let optional = collect_unique(optional)?;
        let set = Self {
            required,
            optional,
            optional_threshold,
        };
        set.check()?;
        Ok(set)
    }

    /// Agent set with only required agents.
    pub fn required_only(required: Vec<Address>) -> Result<Self, ValidationError> {
        Self::new(required, Vec::new(), 0)
    }

    /// Re-check the structural invariants.
    pub fn check(&self) -> Result<(), ValidationError> {
        invariant_agents_disjoint(&self.required, &self.optional)?;
        invariant_threshold(self.optional_threshold, self.optional.len())
    }

    /// Agents that must all attest.
    pub fn required(&self) -> &BTreeSet<Address> {
        &self.required
    }

    /// Agents counted towards the optional threshold.
    pub fn optional(&self) -> &BTreeSet<Address> {
        &self.optional
    }

    /// Number of optional attestations needed.
    pub fn optional_threshold(&self) -> u8 {
        self.optional_threshold
    }
}

fn collect_unique(agents: Vec<Address>) -> Result<BTreeSet<Address>, ValidationError> {
    let mut set = BTreeSet::new();
    for agent in agents {
        if !set.insert(agent) {
            return Err(ValidationError::DuplicateAgent(agent));
        }
    }
    Ok(set)
}

/// Block confirmations before a message is final (send) or accepted (receive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfirmationPolicy {
    /// Minimum block confirmations.
    pub confirmations: u64,
}

impl ConfirmationPolicy {
    /// Create a confirmation policy.
    pub fn new(confirmations: u64) -> Self {
        Self { confirmations }
    }
}

/// Confirmations plus agents for one direction.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct VerificationPolicy {
    /// Confirmation requirement.
    pub confirmations: ConfirmationPolicy,
    /// Attesting agents.
    pub agents: VerificationAgentSet,
}

impl VerificationPolicy {
    /// Create a verification policy.
    pub fn new(confirmations: u64, agents: VerificationAgentSet) -> Self {
        Self {
            confirmations: ConfirmationPolicy::new(confirmations),
            agents,
        }
    }
}

/// Verification applied when the pathway's `from` endpoint sends.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SendVerification(pub VerificationPolicy);

/// Verification applied when the pathway's `to` endpoint receives.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ReceiveVerification(pub VerificationPolicy);

impl SendVerification {
    /// Always [`Direction::Send`].
    pub fn direction(&self) -> Direction {
        Direction::Send
    }

    /// Wrapped policy.
    pub fn policy(&self) -> &VerificationPolicy {
        &self.0
    }
}

impl ReceiveVerification {
    /// Always [`Direction::Receive`].
    pub fn direction(&self) -> Direction {
        Direction::Receive
    }

    /// Wrapped policy.
    pub fn policy(&self) -> &VerificationPolicy {
        &self.0
    }
}

/// Executor delivering messages on the destination chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutorPolicy {
    executor: Address,
    max_message_size: u32,
}

impl ExecutorPolicy {
    /// Create an executor policy; `max_message_size` must be positive.
    pub fn new(executor: Address, max_message_size: u32) -> Result<Self, ValidationError> {
        invariant_message_size(max_message_size)?;
        Ok(Self {
            executor,
            max_message_size,
        })
    }

    /// Executor address.
    pub fn executor(&self) -> Address {
        self.executor
    }

    /// Largest message payload, in bytes.
    pub fn max_message_size(&self) -> u32 {
        self.max_message_size
    }
}

/// Send/receive library binding for a pathway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryBinding {
    /// Library encoding outbound messages.
    pub send_library: Address,
    /// Library verifying inbound messages.
    pub receive_library: Address,
    /// Seconds the previous receive library stays valid after a change.
    pub grace_period: u64,
}

impl LibraryBinding {
    /// Create a library binding.
    pub fn new(send_library: Address, receive_library: Address, grace_period: u64) -> Self {
        Self {
            send_library,
            receive_library,
            grace_period,
        }
    }

    /// True when either library address differs (grace period ignored).
    pub fn libraries_differ(&self, other: &LibraryBinding) -> bool {
        self.send_library != other.send_library || self.receive_library != other.receive_library
    }
}

/// Unique key of a directed pathway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathwayKey {
    /// Source endpoint.
    pub from: EndpointId,
    /// Destination endpoint.
    pub to: EndpointId,
}

impl PathwayKey {
    /// Create a key.
    pub fn new(from: EndpointId, to: EndpointId) -> Self {
        Self { from, to }
    }

    /// The opposite edge.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for PathwayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl FromStr for PathwayKey {
    type Err = String;

    /// Parse `from->to`, e.g. `40217->40161`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once("->")
            .ok_or_else(|| format!("expected FROM->TO, got {s:?}"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map(EndpointId)
                .map_err(|e| format!("invalid endpoint id {part:?}: {e}"))
        };
        Ok(Self::new(parse(from)?, parse(to)?))
    }
}
