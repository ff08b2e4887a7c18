//! EVM JSON-RPC chain handle
//!
//! Reads go through alloy HTTP providers with ordered fallback: the primary
//! URL first, then each fallback, failing only when every endpoint fails.
//! Raw transactions are broadcast to the primary endpoint only, once.
//!
//! Receipts are polled through a lenient raw JSON-RPC client that reads just
//! `transactionHash`, `blockNumber` and `status`. Nothing here deserializes a
//! full block header, so proof-of-authority chains whose `extraData` exceeds
//! the 32-byte mainnet limit are tolerated.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::transports::http::{Client, Http};
use alloy::transports::TransportResult;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::rpc_fallback::create_providers;
use super::{ChainConnector, ChainHandle, TxReceipt};
use crate::config::{ChainConfig, Config};
use crate::error::{classify_rpc_error, classify_submission_error, RelayError};
use crate::types::ChainRole;

/// Transaction receipt fields read from `eth_getTransactionReceipt`
#[derive(Debug, Deserialize)]
struct RawReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    status: Option<String>,
}

/// EVM RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// EVM RPC error
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn parse_quantity(hex: &str) -> Result<u64, String> {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| format!("invalid quantity {}: {}", hex, e))
}

/// Chain handle over one or more HTTP JSON-RPC endpoints
pub struct EvmChainHandle {
    name: String,
    chain_id: u64,
    rpc_urls: Vec<String>,
    providers: Vec<RootProvider<Http<Client>>>,
    http: reqwest::Client,
    receipt_poll_interval: Duration,
}

impl EvmChainHandle {
    /// Create providers for every configured URL and resolve the chain id.
    pub async fn connect(name: &str, config: &ChainConfig) -> Result<Self, RelayError> {
        let rpc_urls = config.all_rpc_urls();
        let providers = create_providers(&rpc_urls)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {}", e)))?;

        let mut handle = Self {
            name: name.to_string(),
            chain_id: 0,
            rpc_urls,
            providers,
            http,
            receipt_poll_interval: config.receipt_poll_interval,
        };

        handle.chain_id = handle
            .read("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map_err(RelayError::Connectivity)?;

        info!(
            chain = %handle.name,
            chain_id = handle.chain_id,
            endpoints = handle.providers.len(),
            "Connected to chain"
        );

        Ok(handle)
    }

    /// Run a read against each endpoint in order until one succeeds.
    async fn read<T, F, Fut>(&self, method: &'static str, op: F) -> Result<T, String>
    where
        F: Fn(RootProvider<Http<Client>>) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = String::from("no RPC endpoints configured");

        for (idx, provider) in self.providers.iter().enumerate() {
            match op(provider.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if idx + 1 < self.providers.len() {
                        warn!(
                            chain = %self.name,
                            method,
                            endpoint = idx,
                            error = %e,
                            "RPC call failed, trying next endpoint"
                        );
                    }
                    last_error = e.to_string();
                }
            }
        }

        Err(last_error)
    }

    /// `eth_getTransactionReceipt` against each endpoint; `Ok(None)` while pending.
    async fn fetch_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, String> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_getTransactionReceipt",
            "params": [format!("{:?}", tx_hash)],
            "id": 1
        });

        let mut last_error = String::from("no RPC endpoints configured");

        for url in &self.rpc_urls {
            let response = match self.http.post(url).json(&body).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };
            let parsed = match response.json::<RpcResponse<RawReceipt>>().await {
                Ok(parsed) => parsed,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            if let Some(error) = parsed.error {
                last_error = format!("RPC error: {} - {}", error.code, error.message);
                continue;
            }

            let Some(raw) = parsed.result else {
                return Ok(None);
            };
            // Some nodes return a receipt skeleton before the tx is mined
            let Some(block_hex) = raw.block_number else {
                return Ok(None);
            };

            let block_number = parse_quantity(&block_hex)?;
            // Pre-Byzantium receipts carry no status field
            let success = raw.status.as_deref().map_or(true, |s| s != "0x0");
            debug!(
                chain = %self.name,
                tx_hash = %raw.transaction_hash,
                block_number,
                success,
                "Receipt found"
            );

            return Ok(Some(TxReceipt {
                tx_hash,
                block_number,
                success,
            }));
        }

        Err(last_error)
    }
}

#[async_trait]
impl ChainHandle for EvmChainHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn current_height(&self) -> Result<u64, RelayError> {
        self.read("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
            .map_err(RelayError::Connectivity)
    }

    async fn get_logs(
        &self,
        contract: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, RelayError> {
        let filter = Filter::new()
            .address(contract)
            .event_signature(topic0)
            .from_block(from_block)
            .to_block(to_block);

        self.read("eth_getLogs", |p| {
            let filter = filter.clone();
            async move { p.get_logs(&filter).await }
        })
        .await
        .map_err(|e| classify_rpc_error(&e, from_block, to_block))
    }

    async fn account_nonce(&self, address: Address) -> Result<u64, RelayError> {
        self.read("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).await
        })
        .await
        .map_err(RelayError::Connectivity)
    }

    async fn gas_price(&self) -> Result<u128, RelayError> {
        self.read("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
            .map_err(RelayError::Connectivity)
    }

    async fn estimate_gas(&self, call: &TransactionRequest) -> Result<u64, RelayError> {
        self.read("eth_estimateGas", |p| {
            let tx = call.clone();
            async move { p.estimate_gas(&tx).await }
        })
        .await
        .map_err(RelayError::Estimation)
    }

    async fn send_signed_transaction(&self, raw: Bytes) -> Result<B256, RelayError> {
        let primary = self
            .providers
            .first()
            .ok_or_else(|| RelayError::Config("no RPC endpoints configured".to_string()))?;

        match primary.send_raw_transaction(&raw).await {
            Ok(pending) => Ok(*pending.tx_hash()),
            Err(e) => {
                let message = e.to_string();
                Err(RelayError::Submission {
                    class: classify_submission_error(&message),
                    message,
                })
            }
        }
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<TxReceipt, RelayError> {
        let deadline = tokio::time::Instant::now() + timeout;

        let poll = async {
            loop {
                match self.fetch_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => {
                        debug!(chain = %self.name, tx_hash = %tx_hash, error = %e, "Receipt poll failed");
                    }
                }
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        };

        // A single poll can block for the HTTP timeout on every endpoint
        tokio::time::timeout_at(deadline, poll)
            .await
            .map_err(|_| RelayError::ConfirmationTimeout { tx_hash, timeout })
    }
}

/// Connects [`EvmChainHandle`]s from the per-role RPC configuration
#[derive(Debug, Clone)]
pub struct EvmConnector {
    source: ChainConfig,
    destination: ChainConfig,
}

impl EvmConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            source: config.source.clone(),
            destination: config.destination.clone(),
        }
    }
}

#[async_trait]
impl ChainConnector for EvmConnector {
    async fn connect(&self, role: ChainRole) -> Result<Arc<dyn ChainHandle>, RelayError> {
        let config = match role {
            ChainRole::Source => &self.source,
            ChainRole::Destination => &self.destination,
        };
        let handle = EvmChainHandle::connect(role.as_str(), config).await?;
        Ok(Arc::new(handle))
    }
}
