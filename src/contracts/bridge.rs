//! Source / destination bridge ABI definitions
//!
//! The warden only needs one event and one function from each side:
//! - source: scans `Deposit`, receives `withdraw`
//! - destination: scans `Unwrap`, receives `wrap`

use alloy::json_abi::{Event, JsonAbi};
use alloy::primitives::B256;
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};

use crate::error::RelayError;
use crate::types::ChainRole;

sol! {
    /// Source-chain bridge holding the underlying tokens
    contract SourceBridge {
        /// Emitted when a user locks `amount` of `token` for `recipient`
        event Deposit(address indexed token, address indexed recipient, uint256 amount);

        /// Release locked tokens back to `recipient` (warden only)
        function withdraw(address token, address recipient, uint256 amount) external;
    }
}

sol! {
    /// Destination-chain bridge minting wrapped tokens
    contract DestinationBridge {
        /// Emitted when a user burns wrapped tokens to redeem on the source chain
        event Unwrap(
            address indexed underlying_token,
            address indexed wrapped_token,
            address frm,
            address indexed to,
            uint256 amount
        );

        /// Mint wrapped tokens for a source-chain deposit (warden only)
        function wrap(address underlying_token, address recipient, uint256 amount) external;
    }
}

/// ABI items a role's contract must expose
#[derive(Debug, Clone, Copy)]
pub struct AbiRequirement {
    /// Event scanned on this role's chain
    pub event_name: &'static str,
    pub event_topic: B256,
    /// `indexed` flag of each event input, in declaration order
    pub event_indexed: &'static [bool],
    pub event_anonymous: bool,
    /// Function the counterpart's pass calls on this contract
    pub function_name: &'static str,
    pub function_selector: [u8; 4],
}

impl AbiRequirement {
    pub fn for_role(role: ChainRole) -> Self {
        match role {
            ChainRole::Source => Self {
                event_name: "Deposit",
                event_topic: SourceBridge::Deposit::SIGNATURE_HASH,
                event_indexed: &[true, true, false],
                event_anonymous: SourceBridge::Deposit::ANONYMOUS,
                function_name: "withdraw",
                function_selector: SourceBridge::withdrawCall::SELECTOR,
            },
            ChainRole::Destination => Self {
                event_name: "Unwrap",
                event_topic: DestinationBridge::Unwrap::SIGNATURE_HASH,
                event_indexed: &[true, true, false, true, false],
                event_anonymous: DestinationBridge::Unwrap::ANONYMOUS,
                function_name: "wrap",
                function_selector: DestinationBridge::wrapCall::SELECTOR,
            },
        }
    }

    /// Check that a loaded ABI matches the bindings for this role.
    ///
    /// Items are matched by selector, not by name alone. The event must also
    /// index the same inputs as the bindings.
    pub fn check(&self, abi: &JsonAbi) -> Result<(), RelayError> {
        let events = abi.event(self.event_name).ok_or_else(|| {
            RelayError::Config(format!("ABI has no `{}` event", self.event_name))
        })?;
        let matching: Vec<&Event> = events
            .iter()
            .filter(|e| e.selector() == self.event_topic)
            .collect();
        if matching.is_empty() {
            return Err(RelayError::Config(format!(
                "ABI `{}` event does not match the expected signature",
                self.event_name
            )));
        }
        if !matching.iter().any(|e| self.event_layout_matches(e)) {
            return Err(RelayError::Config(format!(
                "ABI `{}` event indexes different inputs than expected (want {:?}, anonymous = {})",
                self.event_name, self.event_indexed, self.event_anonymous
            )));
        }

        let functions = abi.function(self.function_name).ok_or_else(|| {
            RelayError::Config(format!("ABI has no `{}` function", self.function_name))
        })?;
        if !functions
            .iter()
            .any(|f| f.selector().0 == self.function_selector)
        {
            return Err(RelayError::Config(format!(
                "ABI `{}` function does not match the expected signature",
                self.function_name
            )));
        }

        Ok(())
    }

    fn event_layout_matches(&self, event: &Event) -> bool {
        event.anonymous == self.event_anonymous
            && event
                .inputs
                .iter()
                .map(|input| input.indexed)
                .eq(self.event_indexed.iter().copied())
    }
}
