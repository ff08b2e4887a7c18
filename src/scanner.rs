//! Event scanner
//!
//! Fetches bridge event logs for a block range and decodes them into
//! [`RelayEvent`]s once, at the scan boundary. Per-block mode retries each
//! height with capped exponential backoff and skips heights whose retries run
//! out; bulk mode issues one `eth_getLogs` for the whole range and reports any
//! failure to the caller.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::rpc::types::Log;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::ChainHandle;
use crate::contracts::{DestinationBridge, SourceBridge};
use crate::error::RelayError;
use crate::shutdown::{cancellable, check, sleep_or_cancel};
use crate::types::{BlockRange, DepositEvent, EventKind, LogPosition, RelayEvent, UnwrapEvent};

/// Lower bound of the uniform backoff jitter, seconds
const JITTER_MIN_SECS: f64 = 0.1;
/// Upper bound (exclusive) of the uniform backoff jitter, seconds
const JITTER_MAX_SECS: f64 = 0.6;

/// How a block range is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// One `eth_getLogs` per height, retried with backoff
    PerBlock,
    /// One `eth_getLogs` for the whole range, no retry
    Bulk,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::PerBlock => write!(f, "per-block"),
            ScanMode::Bulk => write!(f, "bulk"),
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per-block" | "per_block" | "perblock" => Ok(ScanMode::PerBlock),
            "bulk" => Ok(ScanMode::Bulk),
            other => Err(format!("expected `per-block` or `bulk`, got `{}`", other)),
        }
    }
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub mode: ScanMode,
    /// Attempts per block height in per-block mode
    pub max_retries: u32,
    /// Upper bound on a single backoff sleep
    pub backoff_cap: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::PerBlock,
            max_retries: 5,
            backoff_cap: Duration::from_secs(10),
        }
    }
}

impl ScanConfig {
    /// Backoff after the given failed attempt (1-indexed):
    /// `min(2^attempt + jitter, cap)` with jitter uniform in `[0.1, 0.6)` seconds.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let jitter = rand::rng().random_range(JITTER_MIN_SECS..JITTER_MAX_SECS);
        self.backoff_with_jitter(attempt, jitter)
    }

    fn backoff_with_jitter(&self, attempt: u32, jitter_secs: f64) -> Duration {
        let exp = 2f64.powi(attempt.min(62) as i32);
        let secs = (exp + jitter_secs).min(self.backoff_cap.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Result of scanning one range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Decoded events, ascending by `(block_number, log_index)`, no duplicates
    pub events: Vec<RelayEvent>,
    /// Heights whose log fetch exhausted every retry
    pub skipped_blocks: Vec<u64>,
    /// Logs that matched the topic but failed to decode
    pub undecodable: usize,
}

/// Scans one contract on one chain for one event kind
pub struct EventScanner<'a> {
    chain: &'a dyn ChainHandle,
    config: &'a ScanConfig,
    cancel: CancellationToken,
}

impl<'a> EventScanner<'a> {
    pub fn new(chain: &'a dyn ChainHandle, config: &'a ScanConfig, cancel: CancellationToken) -> Self {
        Self {
            chain,
            config,
            cancel,
        }
    }

    /// Latest block height, retried with the same backoff as log fetches.
    pub async fn latest_height(&self) -> Result<u64, RelayError> {
        let max_retries = self.config.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let error = match cancellable(&self.cancel, self.chain.current_height()).await {
                Ok(height) => return Ok(height),
                Err(e) if !e.is_retryable_scan_error() || attempt >= max_retries => {
                    return Err(e)
                }
                Err(e) => e,
            };

            let backoff = self.config.backoff_for_attempt(attempt);
            debug!(
                chain = %self.chain.name(),
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Height query failed, backing off"
            );
            sleep_or_cancel(&self.cancel, backoff).await?;
            attempt += 1;
        }
    }

    /// Fetch and decode `kind` events emitted by `contract` within `range`.
    pub async fn scan(
        &self,
        contract: Address,
        kind: EventKind,
        range: BlockRange,
    ) -> Result<ScanReport, RelayError> {
        let (logs, skipped_blocks) = match self.config.mode {
            ScanMode::Bulk => (self.fetch_bulk(contract, kind, range).await?, Vec::new()),
            ScanMode::PerBlock => self.fetch_per_block(contract, kind, range).await?,
        };

        let mut report = ScanReport {
            skipped_blocks,
            ..Default::default()
        };

        for log in &logs {
            match decode_log(kind, log) {
                Some(event) => report.events.push(event),
                None => {
                    warn!(
                        chain = %self.chain.name(),
                        event = %kind,
                        block = ?log.block_number,
                        log_index = ?log.log_index,
                        tx_hash = ?log.transaction_hash,
                        "Failed to decode log, skipping"
                    );
                    report.undecodable += 1;
                }
            }
        }

        report.events.sort_by_key(RelayEvent::ordering_key);
        report.events.dedup_by_key(|event| event.ordering_key());

        info!(
            chain = %self.chain.name(),
            event = %kind,
            range = %range,
            blocks = range.block_count(),
            found = report.events.len(),
            skipped = report.skipped_blocks.len(),
            "Scan complete"
        );

        Ok(report)
    }

    async fn fetch_bulk(
        &self,
        contract: Address,
        kind: EventKind,
        range: BlockRange,
    ) -> Result<Vec<Log>, RelayError> {
        check(&self.cancel)?;
        cancellable(
            &self.cancel,
            self.chain
                .get_logs(contract, kind.topic(), range.start, range.end),
        )
        .await
        .inspect_err(|e| {
            warn!(
                chain = %self.chain.name(),
                event = %kind,
                range = %range,
                error = %e,
                "Bulk log fetch failed"
            );
        })
    }

    async fn fetch_per_block(
        &self,
        contract: Address,
        kind: EventKind,
        range: BlockRange,
    ) -> Result<(Vec<Log>, Vec<u64>), RelayError> {
        let mut logs = Vec::new();
        let mut skipped = Vec::new();

        for height in range.heights() {
            check(&self.cancel)?;
            match self.fetch_height(contract, kind, height).await? {
                Some(found) => logs.extend(found),
                None => skipped.push(height),
            }
        }

        Ok((logs, skipped))
    }

    /// `Ok(None)` when every attempt for `height` failed. Errors that
    /// retrying cannot fix abort the scan.
    async fn fetch_height(
        &self,
        contract: Address,
        kind: EventKind,
        height: u64,
    ) -> Result<Option<Vec<Log>>, RelayError> {
        let max_retries = self.config.max_retries.max(1);

        for attempt in 1..=max_retries {
            let result = cancellable(
                &self.cancel,
                self.chain.get_logs(contract, kind.topic(), height, height),
            )
            .await;

            let error = match result {
                Ok(logs) => return Ok(Some(logs)),
                Err(e) if !e.is_retryable_scan_error() => return Err(e),
                Err(e) => e,
            };

            if attempt == max_retries {
                warn!(
                    chain = %self.chain.name(),
                    event = %kind,
                    block = height,
                    attempts = max_retries,
                    error = %error,
                    error_kind = error.kind(),
                    "Log fetch exhausted retries, skipping block"
                );
                break;
            }

            let backoff = self.config.backoff_for_attempt(attempt);
            debug!(
                chain = %self.chain.name(),
                block = height,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Log fetch failed, backing off"
            );
            sleep_or_cancel(&self.cancel, backoff).await?;
        }

        Ok(None)
    }
}

/// Decode a raw log into the typed event for `kind`.
fn decode_log(kind: EventKind, log: &Log) -> Option<RelayEvent> {
    let position = LogPosition {
        block_number: log.block_number?,
        log_index: log.log_index?,
        tx_hash: log.transaction_hash.unwrap_or_default(),
    };

    match kind {
        EventKind::Deposit => {
            let decoded = log.log_decode::<SourceBridge::Deposit>().ok()?;
            let event = decoded.inner.data;
            Some(RelayEvent::Deposit(DepositEvent {
                token: event.token,
                recipient: event.recipient,
                amount: event.amount,
                position,
            }))
        }
        EventKind::Unwrap => {
            let decoded = log.log_decode::<DestinationBridge::Unwrap>().ok()?;
            let event = decoded.inner.data;
            Some(RelayEvent::Unwrap(UnwrapEvent {
                underlying_token: event.underlying_token,
                wrapped_token: event.wrapped_token,
                from: event.frm,
                destination_address: event.to,
                amount: event.amount,
                position,
            }))
        }
    }
}
