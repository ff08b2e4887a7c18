use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::rpc::types::{Log, TransactionRequest};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;

use crate::chain::{ChainHandle, TxReceipt};
use crate::contracts::{DestinationBridge, SourceBridge};
use crate::error::{classify_submission_error, RelayError};
use crate::types::MirroredCall;

/// A transaction the mock accepted, decoded from its raw bytes
#[derive(Debug, Clone)]
pub struct SentTx {
    pub tx_hash: B256,
    pub signer: Address,
    pub to: Address,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: Option<u128>,
    pub chain_id: Option<u64>,
    pub call: MirroredCall,
}

#[derive(Default)]
struct State {
    height: u64,
    logs: Vec<Log>,
    /// Remaining scripted failures per block height
    block_failures: HashMap<u64, u32>,
    log_requests: Vec<(u64, u64)>,
    /// Non-retryable error returned by every `get_logs`
    log_rejection: Option<String>,
    height_failures: u32,
    estimate: Option<u64>,
    send_failures: HashMap<usize, String>,
    reverting_sends: Vec<usize>,
    withhold_receipts: bool,
    send_attempts: usize,
    nonces: HashMap<Address, u64>,
    sent: Vec<SentTx>,
    receipts: HashMap<B256, TxReceipt>,
}

/// Scripted in-memory [`ChainHandle`]
pub struct MockChain {
    name: String,
    chain_id: u64,
    state: Mutex<State>,
}

impl MockChain {
    pub fn new(name: &str, chain_id: u64) -> Self {
        Self {
            name: name.to_string(),
            chain_id,
            state: Mutex::new(State {
                height: 100,
                estimate: Some(50_000),
                ..Default::default()
            }),
        }
    }

    /// Build the RPC log `event` would produce at `(block, log_index)`.
    pub fn encode_log<E: SolEvent>(contract: Address, block: u64, log_index: u64, event: &E) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: contract,
                data: event.encode_log_data(),
            },
            block_number: Some(block),
            log_index: Some(log_index),
            transaction_hash: Some(keccak256(format!("{}:{}", block, log_index))),
            ..Default::default()
        }
    }

    pub fn add_event<E: SolEvent>(&self, contract: Address, block: u64, log_index: u64, event: &E) {
        let log = Self::encode_log(contract, block, log_index, event);
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn add_raw_log(&self, log: Log) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn set_height(&self, height: u64) {
        self.state.lock().unwrap().height = height;
    }

    /// Make the next `times` queries touching `height` fail.
    pub fn fail_block(&self, height: u64, times: u32) {
        self.state.lock().unwrap().block_failures.insert(height, times);
    }

    /// Answer every `get_logs` with a configuration error.
    pub fn reject_logs(&self, message: &str) {
        self.state.lock().unwrap().log_rejection = Some(message.to_string());
    }

    /// Make the next `times` `current_height` calls fail.
    pub fn fail_height_queries(&self, times: u32) {
        self.state.lock().unwrap().height_failures = times;
    }

    /// `None` makes every estimate fail.
    pub fn set_estimate(&self, estimate: Option<u64>) {
        self.state.lock().unwrap().estimate = estimate;
    }

    /// Reject the `nth` (1-based) broadcast with `message`.
    pub fn fail_send(&self, nth: usize, message: &str) {
        self.state
            .lock()
            .unwrap()
            .send_failures
            .insert(nth, message.to_string());
    }

    /// Mine the `nth` (1-based) broadcast with status 0.
    pub fn revert_send(&self, nth: usize) {
        self.state.lock().unwrap().reverting_sends.push(nth);
    }

    /// Never produce receipts.
    pub fn withhold_receipts(&self) {
        self.state.lock().unwrap().withhold_receipts = true;
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.state.lock().unwrap().send_attempts
    }

    /// Number of `get_logs` calls whose range covered `height`
    pub fn log_requests_for(&self, height: u64) -> usize {
        self.state
            .lock()
            .unwrap()
            .log_requests
            .iter()
            .filter(|(from, to)| (*from..=*to).contains(&height))
            .count()
    }
}

fn decode_call(input: &[u8]) -> Result<MirroredCall, String> {
    if input.starts_with(&DestinationBridge::wrapCall::SELECTOR) {
        let call = DestinationBridge::wrapCall::abi_decode(input, true).map_err(|e| e.to_string())?;
        return Ok(MirroredCall::Wrap {
            token: call.underlying_token,
            recipient: call.recipient,
            amount: call.amount,
        });
    }
    if input.starts_with(&SourceBridge::withdrawCall::SELECTOR) {
        let call = SourceBridge::withdrawCall::abi_decode(input, true).map_err(|e| e.to_string())?;
        return Ok(MirroredCall::Withdraw {
            token: call.token,
            recipient: call.recipient,
            amount: call.amount,
        });
    }
    Err("unknown selector".to_string())
}

#[async_trait]
impl ChainHandle for MockChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn current_height(&self) -> Result<u64, RelayError> {
        let mut state = self.state.lock().unwrap();
        if state.height_failures > 0 {
            state.height_failures -= 1;
            return Err(RelayError::Connectivity("connection refused".to_string()));
        }
        Ok(state.height)
    }

    async fn get_logs(
        &self,
        contract: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, RelayError> {
        let mut state = self.state.lock().unwrap();
        state.log_requests.push((from_block, to_block));

        if let Some(message) = &state.log_rejection {
            return Err(RelayError::Config(message.clone()));
        }

        let failing = state
            .block_failures
            .iter_mut()
            .find(|(height, remaining)| (from_block..=to_block).contains(*height) && **remaining > 0);
        if let Some((height, remaining)) = failing {
            *remaining -= 1;
            return Err(RelayError::Connectivity(format!(
                "429 Too Many Requests at block {}",
                height
            )));
        }

        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.inner.address == contract
                    && log.inner.data.topics().first() == Some(&topic0)
                    && log
                        .block_number
                        .is_some_and(|b| (from_block..=to_block).contains(&b))
            })
            .cloned()
            .collect())
    }

    async fn account_nonce(&self, address: Address) -> Result<u64, RelayError> {
        Ok(*self.state.lock().unwrap().nonces.get(&address).unwrap_or(&0))
    }

    async fn gas_price(&self) -> Result<u128, RelayError> {
        Ok(1_000_000_000)
    }

    async fn estimate_gas(&self, _call: &TransactionRequest) -> Result<u64, RelayError> {
        self.state
            .lock()
            .unwrap()
            .estimate
            .ok_or_else(|| RelayError::Estimation("execution reverted".to_string()))
    }

    async fn send_signed_transaction(&self, raw: Bytes) -> Result<B256, RelayError> {
        let mut state = self.state.lock().unwrap();
        state.send_attempts += 1;
        let attempt = state.send_attempts;

        if let Some(message) = state.send_failures.get(&attempt) {
            return Err(RelayError::Submission {
                class: classify_submission_error(message),
                message: message.clone(),
            });
        }

        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| RelayError::Connectivity(format!("undecodable tx: {}", e)))?;
        let signer = envelope
            .recover_signer()
            .map_err(|e| RelayError::Connectivity(format!("bad signature: {}", e)))?;
        let call = decode_call(envelope.input()).map_err(RelayError::Connectivity)?;
        let tx_hash = *envelope.tx_hash();

        let tx = SentTx {
            tx_hash,
            signer,
            to: envelope.to().unwrap_or_default(),
            nonce: envelope.nonce(),
            gas_limit: envelope.gas_limit(),
            gas_price: envelope.gas_price(),
            chain_id: envelope.chain_id(),
            call,
        };

        *state.nonces.entry(signer).or_insert(0) += 1;
        state.height += 1;
        let receipt = TxReceipt {
            tx_hash,
            block_number: state.height,
            success: !state.reverting_sends.contains(&attempt),
        };
        state.receipts.insert(tx_hash, receipt);
        state.sent.push(tx);

        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<TxReceipt, RelayError> {
        let state = self.state.lock().unwrap();
        if state.withhold_receipts {
            return Err(RelayError::ConfirmationTimeout { tx_hash, timeout });
        }
        state
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or(RelayError::ConfirmationTimeout { tx_hash, timeout })
    }
}
