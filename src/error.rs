//! Relay error taxonomy
//!
//! Every failure the relay pipeline can surface maps to one [`RelayError`]
//! variant, so callers decide skip-vs-abort from the kind instead of from
//! message text. Provider errors arrive as strings from the transport and are
//! classified here.

use std::fmt;
use std::time::Duration;

use alloy::primitives::B256;
use thiserror::Error;

/// Why a signed transaction was rejected or failed on-chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// Nonce too low / too high / already known
    NonceConflict,
    /// Gas price below the node's floor or replacement underpriced
    Underpriced,
    /// Signer cannot pay for gas
    InsufficientFunds,
    /// Execution reverted (at send time or in the receipt)
    Reverted,
    /// Anything the node did not explain in a recognizable way
    Other,
}

impl SubmissionFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionFailure::NonceConflict => "nonce_conflict",
            SubmissionFailure::Underpriced => "underpriced",
            SubmissionFailure::InsufficientFunds => "insufficient_funds",
            SubmissionFailure::Reverted => "reverted",
            SubmissionFailure::Other => "other",
        }
    }
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors produced by the relay pipeline
#[derive(Debug, Error)]
pub enum RelayError {
    /// Bad or missing contract descriptor / configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Endpoint unreachable, rate limited or otherwise flaky
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Provider refused the requested block range
    #[error("block range {from}..={to} rejected by provider: {message}")]
    RangeTooLarge { from: u64, to: u64, message: String },

    /// The node could not simulate the call
    #[error("gas estimation failed: {0}")]
    Estimation(String),

    /// The node rejected the signed transaction
    #[error("submission rejected ({class}): {message}")]
    Submission {
        class: SubmissionFailure,
        message: String,
    },

    /// Transaction was not mined within the confirmation window
    #[error("transaction {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx_hash: B256, timeout: Duration },

    /// Transaction was mined with status 0
    #[error("transaction {tx_hash} reverted in block {block_number}")]
    Reverted { tx_hash: B256, block_number: u64 },

    /// Shutdown was requested while the operation was in flight
    #[error("operation cancelled by shutdown")]
    Cancelled,
}

impl RelayError {
    /// Short machine-friendly label, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "config",
            RelayError::Connectivity(_) => "connectivity",
            RelayError::RangeTooLarge { .. } => "range_too_large",
            RelayError::Estimation(_) => "estimation",
            RelayError::Submission { .. } => "submission",
            RelayError::ConfirmationTimeout { .. } => "confirmation_timeout",
            RelayError::Reverted { .. } => "reverted",
            RelayError::Cancelled => "cancelled",
        }
    }

    /// Scan-time errors that are worth retrying at block granularity
    pub fn is_retryable_scan_error(&self) -> bool {
        matches!(
            self,
            RelayError::Connectivity(_) | RelayError::RangeTooLarge { .. }
        )
    }
}

/// Classify a provider error raised while reading logs for `from..=to`.
pub fn classify_rpc_error(error: &str, from: u64, to: u64) -> RelayError {
    let lower = error.to_lowercase();

    if lower.contains("block range")
        || lower.contains("range too large")
        || lower.contains("query returned more than")
        || lower.contains("response size exceeded")
        || lower.contains("block range limit")
        || lower.contains("exceed maximum block range")
        || lower.contains("too many blocks")
    {
        return RelayError::RangeTooLarge {
            from,
            to,
            message: error.to_string(),
        };
    }

    RelayError::Connectivity(error.to_string())
}

/// Classify the error string returned by `eth_sendRawTransaction`.
pub fn classify_submission_error(error: &str) -> SubmissionFailure {
    let lower = error.to_lowercase();

    if lower.contains("nonce too low")
        || lower.contains("nonce too high")
        || lower.contains("already known")
        || lower.contains("already been processed")
        || lower.contains("invalid nonce")
    {
        return SubmissionFailure::NonceConflict;
    }

    if lower.contains("underpriced")
        || lower.contains("gas price too low")
        || lower.contains("max fee per gas less than")
    {
        return SubmissionFailure::Underpriced;
    }

    if lower.contains("insufficient funds") {
        return SubmissionFailure::InsufficientFunds;
    }

    if lower.contains("reverted") || lower.contains("execution reverted") {
        return SubmissionFailure::Reverted;
    }

    SubmissionFailure::Other
}
