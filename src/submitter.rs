//! Transaction submission
//!
//! Builds, signs and broadcasts one mirrored call, then waits for its
//! receipt. The nonce is read fresh immediately before signing; a failed
//! broadcast is surfaced and never resent.

use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::ChainHandle;
use crate::descriptor::ContractDescriptor;
use crate::error::{RelayError, SubmissionFailure};
use crate::gas::GasEstimator;
use crate::shutdown::cancellable;
use crate::types::{MirroredCall, SubmissionResult};

/// Submits mirrored calls on the counterpart chain
#[derive(Debug, Clone)]
pub struct TransactionSubmitter {
    gas: GasEstimator,
    receipt_timeout: Duration,
    cancel: CancellationToken,
}

impl TransactionSubmitter {
    pub fn new(gas: GasEstimator, receipt_timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            gas,
            receipt_timeout,
            cancel,
        }
    }

    /// Sign and send `call` to `descriptor`'s contract and wait for it to be mined.
    pub async fn submit(
        &self,
        call: &MirroredCall,
        descriptor: &ContractDescriptor,
        chain: &dyn ChainHandle,
    ) -> Result<SubmissionResult, RelayError> {
        if call.target_role() != descriptor.role() {
            return Err(RelayError::Config(format!(
                "`{}` belongs on the {} contract, not the {} contract",
                call.name(),
                call.target_role(),
                descriptor.role()
            )));
        }

        let signer = descriptor.account();
        let contract = descriptor.address();
        let input = call.calldata();

        let nonce = cancellable(&self.cancel, chain.account_nonce(signer)).await?;

        let estimate_request = TransactionRequest::default()
            .with_from(signer)
            .with_to(contract)
            .with_input(input.clone());
        let gas_limit = self.gas.estimate(chain, &estimate_request).await;

        let gas_price = cancellable(&self.cancel, chain.gas_price()).await?;

        let tx = estimate_request
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .with_chain_id(chain.chain_id());

        let envelope = tx.build(&descriptor.wallet()).await.map_err(|e| {
            RelayError::Submission {
                class: SubmissionFailure::Other,
                message: format!("failed to sign transaction: {}", e),
            }
        })?;
        let raw = envelope.encoded_2718();

        debug!(
            chain = %chain.name(),
            call = call.name(),
            to = %contract,
            from = %signer,
            nonce,
            gas_limit,
            gas_price,
            "Sending signed transaction"
        );

        // Broadcast is not cancellable: once bytes leave the process the nonce is spent
        let tx_hash = chain.send_signed_transaction(raw.into()).await?;

        info!(
            chain = %chain.name(),
            call = call.name(),
            tx_hash = %tx_hash,
            nonce,
            "Transaction submitted, awaiting receipt"
        );

        let receipt = cancellable(
            &self.cancel,
            chain.wait_for_receipt(tx_hash, self.receipt_timeout),
        )
        .await
        .inspect_err(|e| {
            warn!(
                chain = %chain.name(),
                tx_hash = %tx_hash,
                nonce,
                error = %e,
                "Transaction not confirmed; it may still be pending"
            );
        })?;

        if !receipt.success {
            return Err(RelayError::Reverted {
                tx_hash,
                block_number: receipt.block_number,
            });
        }

        Ok(SubmissionResult {
            tx_hash,
            confirmed_block_number: receipt.block_number,
            nonce,
            gas_limit,
        })
    }
}
