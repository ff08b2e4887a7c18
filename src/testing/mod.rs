//! Test fixtures: a scripted chain, contract descriptors and ABIs

mod mock_chain;

pub use mock_chain::{MockChain, SentTx};

use std::collections::HashMap;
use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{address, Address, U256};
use async_trait::async_trait;

use crate::chain::{ChainConnector, ChainHandle};
use crate::contracts::{DestinationBridge, SourceBridge};
use crate::descriptor::ContractDescriptor;
use crate::error::RelayError;
use crate::types::ChainRole;

pub const SOURCE_CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const DESTINATION_CONTRACT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

/// Anvil account #0
pub const SOURCE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
/// Anvil account #1
pub const DESTINATION_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
/// Anvil account #2
pub const WARDEN_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

pub const SOURCE_ABI_JSON: &str = r#"[
    {"type":"event","name":"Deposit","anonymous":false,"inputs":[
        {"name":"token","type":"address","indexed":true},
        {"name":"recipient","type":"address","indexed":true},
        {"name":"amount","type":"uint256","indexed":false}
    ]},
    {"type":"function","name":"withdraw","stateMutability":"nonpayable","inputs":[
        {"name":"token","type":"address"},
        {"name":"recipient","type":"address"},
        {"name":"amount","type":"uint256"}
    ],"outputs":[]}
]"#;

pub const DESTINATION_ABI_JSON: &str = r#"[
    {"type":"event","name":"Unwrap","anonymous":false,"inputs":[
        {"name":"underlying_token","type":"address","indexed":true},
        {"name":"wrapped_token","type":"address","indexed":true},
        {"name":"frm","type":"address","indexed":false},
        {"name":"to","type":"address","indexed":true},
        {"name":"amount","type":"uint256","indexed":false}
    ]},
    {"type":"function","name":"wrap","stateMutability":"nonpayable","inputs":[
        {"name":"underlying_token","type":"address"},
        {"name":"recipient","type":"address"},
        {"name":"amount","type":"uint256"}
    ],"outputs":[]}
]"#;

/// Descriptor store document for both roles
pub fn contract_info_json(with_warden: bool) -> String {
    let source_abi: serde_json::Value = serde_json::from_str(SOURCE_ABI_JSON).unwrap();
    let destination_abi: serde_json::Value = serde_json::from_str(DESTINATION_ABI_JSON).unwrap();

    let mut doc = serde_json::json!({
        "source": {
            "address": SOURCE_CONTRACT.to_string(),
            "abi": source_abi,
            "private_key": SOURCE_KEY,
        },
        "destination": {
            "address": DESTINATION_CONTRACT.to_string(),
            "abi": destination_abi,
            "private_key": DESTINATION_KEY,
        }
    });
    if with_warden {
        doc["destination"]["warden_key"] = serde_json::json!(WARDEN_KEY);
    }
    doc.to_string()
}

pub fn source_descriptor() -> ContractDescriptor {
    let abi: JsonAbi = serde_json::from_str(SOURCE_ABI_JSON).unwrap();
    ContractDescriptor::new(ChainRole::Source, &SOURCE_CONTRACT.to_string(), &abi, SOURCE_KEY)
        .unwrap()
}

pub fn destination_descriptor() -> ContractDescriptor {
    let abi: JsonAbi = serde_json::from_str(DESTINATION_ABI_JSON).unwrap();
    ContractDescriptor::new(
        ChainRole::Destination,
        &DESTINATION_CONTRACT.to_string(),
        &abi,
        DESTINATION_KEY,
    )
    .unwrap()
}

pub fn deposit(token: Address, recipient: Address, amount: u64) -> SourceBridge::Deposit {
    SourceBridge::Deposit {
        token,
        recipient,
        amount: U256::from(amount),
    }
}

pub fn unwrap_event(
    underlying_token: Address,
    wrapped_token: Address,
    to: Address,
    amount: u64,
) -> DestinationBridge::Unwrap {
    DestinationBridge::Unwrap {
        underlying_token,
        wrapped_token,
        frm: address!("00000000000000000000000000000000000000f0"),
        to,
        amount: U256::from(amount),
    }
}

/// Hands out pre-built chains; a role without one fails to connect
#[derive(Default)]
pub struct StaticConnector {
    chains: HashMap<ChainRole, Arc<dyn ChainHandle>>,
}

impl StaticConnector {
    pub fn new(source: Arc<MockChain>, destination: Arc<MockChain>) -> Self {
        Self::default()
            .with(ChainRole::Source, source)
            .with(ChainRole::Destination, destination)
    }

    pub fn with(mut self, role: ChainRole, chain: Arc<MockChain>) -> Self {
        self.chains.insert(role, chain);
        self
    }
}

#[async_trait]
impl ChainConnector for StaticConnector {
    async fn connect(&self, role: ChainRole) -> Result<Arc<dyn ChainHandle>, RelayError> {
        self.chains
            .get(&role)
            .cloned()
            .ok_or_else(|| RelayError::Connectivity(format!("{} endpoint unreachable", role)))
    }
}
