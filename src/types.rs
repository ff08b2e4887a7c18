//! Core relay types
//!
//! Roles, block ranges, decoded bridge events and the calls they mirror to.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolEvent};
use serde::{Deserialize, Serialize};

use crate::contracts::{DestinationBridge, SourceBridge};

/// Which side of the bridge a pass runs from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    Source,
    Destination,
}

impl ChainRole {
    pub const ALL: [ChainRole; 2] = [ChainRole::Source, ChainRole::Destination];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainRole::Source => "source",
            ChainRole::Destination => "destination",
        }
    }

    pub fn counterpart(&self) -> ChainRole {
        match self {
            ChainRole::Source => ChainRole::Destination,
            ChainRole::Destination => ChainRole::Source,
        }
    }

    /// Event this role's contract emits for the warden to mirror
    pub fn event_kind(&self) -> EventKind {
        match self {
            ChainRole::Source => EventKind::Deposit,
            ChainRole::Destination => EventKind::Unwrap,
        }
    }
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChainRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "source" => Ok(ChainRole::Source),
            "destination" => Ok(ChainRole::Destination),
            other => Err(format!("invalid chain role: {}", other)),
        }
    }
}

/// Bridge event kinds the scanner understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Deposit,
    Unwrap,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Deposit => "Deposit",
            EventKind::Unwrap => "Unwrap",
        }
    }

    /// topic0 of the event log
    pub fn topic(&self) -> B256 {
        match self {
            EventKind::Deposit => SourceBridge::Deposit::SIGNATURE_HASH,
            EventKind::Unwrap => DestinationBridge::Unwrap::SIGNATURE_HASH,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Inclusive block range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    /// `start` must not exceed `end`
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// `[current - window, current]`, clamped at genesis
    pub fn trailing(current: u64, window: u64) -> Self {
        Self {
            start: current.saturating_sub(window),
            end: current,
        }
    }

    pub fn heights(&self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }

    pub fn block_count(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Where a log sits on its chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPosition {
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: B256,
}

/// Source-chain `Deposit(token, recipient, amount)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
    pub position: LogPosition,
}

/// Destination-chain `Unwrap(underlying_token, wrapped_token, frm, to, amount)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwrapEvent {
    pub underlying_token: Address,
    pub wrapped_token: Address,
    pub from: Address,
    pub destination_address: Address,
    pub amount: U256,
    pub position: LogPosition,
}

/// A decoded bridge event awaiting relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayEvent {
    Deposit(DepositEvent),
    Unwrap(UnwrapEvent),
}

impl RelayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RelayEvent::Deposit(_) => EventKind::Deposit,
            RelayEvent::Unwrap(_) => EventKind::Unwrap,
        }
    }

    pub fn position(&self) -> &LogPosition {
        match self {
            RelayEvent::Deposit(e) => &e.position,
            RelayEvent::Unwrap(e) => &e.position,
        }
    }

    pub fn block_number(&self) -> u64 {
        self.position().block_number
    }

    pub fn log_index(&self) -> u64 {
        self.position().log_index
    }

    pub fn tx_hash(&self) -> B256 {
        self.position().tx_hash
    }

    /// Canonical processing order within a scan
    pub fn ordering_key(&self) -> (u64, u64) {
        (self.block_number(), self.log_index())
    }

    /// Call to issue on the counterpart chain
    pub fn mirrored_call(&self) -> MirroredCall {
        match self {
            RelayEvent::Deposit(e) => MirroredCall::Wrap {
                token: e.token,
                recipient: e.recipient,
                amount: e.amount,
            },
            RelayEvent::Unwrap(e) => MirroredCall::Withdraw {
                token: e.underlying_token,
                recipient: e.destination_address,
                amount: e.amount,
            },
        }
    }
}

/// Action performed on the counterpart chain for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirroredCall {
    /// `wrap(underlying_token, recipient, amount)` on the destination bridge
    Wrap {
        token: Address,
        recipient: Address,
        amount: U256,
    },
    /// `withdraw(token, recipient, amount)` on the source bridge
    Withdraw {
        token: Address,
        recipient: Address,
        amount: U256,
    },
}

impl MirroredCall {
    pub fn name(&self) -> &'static str {
        match self {
            MirroredCall::Wrap { .. } => "wrap",
            MirroredCall::Withdraw { .. } => "withdraw",
        }
    }

    /// Role whose contract receives this call
    pub fn target_role(&self) -> ChainRole {
        match self {
            MirroredCall::Wrap { .. } => ChainRole::Destination,
            MirroredCall::Withdraw { .. } => ChainRole::Source,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            MirroredCall::Wrap { amount, .. } | MirroredCall::Withdraw { amount, .. } => *amount,
        }
    }

    /// ABI-encoded calldata
    pub fn calldata(&self) -> Bytes {
        match self {
            MirroredCall::Wrap {
                token,
                recipient,
                amount,
            } => DestinationBridge::wrapCall {
                underlying_token: *token,
                recipient: *recipient,
                amount: *amount,
            }
            .abi_encode()
            .into(),
            MirroredCall::Withdraw {
                token,
                recipient,
                amount,
            } => SourceBridge::withdrawCall {
                token: *token,
                recipient: *recipient,
                amount: *amount,
            }
            .abi_encode()
            .into(),
        }
    }
}

/// A mirrored call that was mined successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub tx_hash: B256,
    pub confirmed_block_number: u64,
    pub nonce: u64,
    pub gas_limit: u64,
}
