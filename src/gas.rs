//! Gas limit estimation with a safety margin and a fixed fallback

use alloy::rpc::types::TransactionRequest;
use tracing::{debug, warn};

use crate::chain::ChainHandle;

/// Turns `eth_estimateGas` into a usable gas limit, never failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimator {
    /// Percentage added on top of the node's estimate
    pub margin_percent: u64,
    /// Gas limit used when estimation fails
    pub fallback_limit: u64,
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self {
            margin_percent: 20,
            fallback_limit: 200_000,
        }
    }
}

impl GasEstimator {
    /// `ceil(estimate * (100 + margin) / 100)`, or the fallback limit on any error.
    pub async fn estimate(&self, chain: &dyn ChainHandle, call: &TransactionRequest) -> u64 {
        match chain.estimate_gas(call).await {
            Ok(estimate) => {
                let limit = self.with_margin(estimate);
                debug!(chain = %chain.name(), estimate, gas_limit = limit, "Gas estimated");
                limit
            }
            Err(e) => {
                warn!(
                    chain = %chain.name(),
                    error = %e,
                    fallback = self.fallback_limit,
                    "Gas estimation failed, using fallback limit"
                );
                self.fallback_limit
            }
        }
    }

    fn with_margin(&self, estimate: u64) -> u64 {
        let scaled = u128::from(estimate) * u128::from(100 + self.margin_percent);
        let limit = scaled.div_ceil(100);
        u64::try_from(limit).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[tokio::test]
    async fn test_margin_applied_to_estimate() {
        let chain = MockChain::new("destination", 2);
        chain.set_estimate(Some(100_000));
        let limit = GasEstimator::default()
            .estimate(&chain, &TransactionRequest::default())
            .await;
        assert_eq!(limit, 120_000);
    }

    #[tokio::test]
    async fn test_failed_estimate_uses_fallback() {
        let chain = MockChain::new("destination", 2);
        chain.set_estimate(None);
        let limit = GasEstimator::default()
            .estimate(&chain, &TransactionRequest::default())
            .await;
        assert_eq!(limit, 200_000);
    }

    #[test]
    fn test_margin_rounds_up() {
        let gas = GasEstimator::default();
        assert_eq!(gas.with_margin(21_001), 25_202);
        assert_eq!(gas.with_margin(1), 2);
        assert_eq!(gas.with_margin(0), 0);
        assert_eq!(gas.with_margin(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_zero_margin_is_identity() {
        let gas = GasEstimator {
            margin_percent: 0,
            fallback_limit: 1,
        };
        assert_eq!(gas.with_margin(54_321), 54_321);
    }
}
