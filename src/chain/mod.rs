//! Chain access
//!
//! [`ChainHandle`] is the only way the relay pipeline touches a blockchain.
//! The production implementation is [`EvmChainHandle`]; tests substitute a
//! scripted handle.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::{Log, TransactionRequest};
use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::ChainRole;

pub mod evm;
pub mod rpc_fallback;

pub use evm::{EvmChainHandle, EvmConnector};

/// Minimal receipt view needed to report a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    /// `status == 1`
    pub success: bool,
}

/// One blockchain endpoint as seen by the relay pipeline
#[async_trait]
pub trait ChainHandle: Send + Sync {
    /// Human-readable label used in logs
    fn name(&self) -> &str;

    /// EIP-155 chain id, resolved when the handle was created
    fn chain_id(&self) -> u64;

    /// Latest block number
    async fn current_height(&self) -> Result<u64, RelayError>;

    /// All logs emitted by `contract` with `topic0` in `[from_block, to_block]`
    async fn get_logs(
        &self,
        contract: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, RelayError>;

    /// Transaction count of `address` (next nonce to use)
    async fn account_nonce(&self, address: Address) -> Result<u64, RelayError>;

    /// Current legacy gas price in wei
    async fn gas_price(&self) -> Result<u128, RelayError>;

    /// Simulate `call` and return the gas it would use
    async fn estimate_gas(&self, call: &TransactionRequest) -> Result<u64, RelayError>;

    /// Broadcast an EIP-2718 encoded signed transaction
    async fn send_signed_transaction(&self, raw: Bytes) -> Result<B256, RelayError>;

    /// Poll until `tx_hash` is mined or `timeout` elapses
    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<TxReceipt, RelayError>;
}

/// Resolves the chain handle for a role at the start of a pass
#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self, role: ChainRole) -> Result<Arc<dyn ChainHandle>, RelayError>;
}
