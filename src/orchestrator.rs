//! Relay orchestrator
//!
//! One pass per role walks `Init -> Delay -> Scan -> Relay -> Done`:
//! resolve both sides, wait out the settlement delay, scan the trailing
//! window on the role's own chain, then mirror each event onto the
//! counterpart chain strictly in scan order. A failed event is recorded and
//! the batch moves on. Nothing is persisted between passes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chain::{ChainConnector, ChainHandle};
use crate::config::RelayConfig;
use crate::descriptor::{ContractDescriptor, DescriptorStore};
use crate::error::RelayError;
use crate::scanner::EventScanner;
use crate::shutdown::{check, sleep_or_cancel};
use crate::submitter::TransactionSubmitter;
use crate::types::{BlockRange, ChainRole, RelayEvent, SubmissionResult};

/// Scheduling delays between pass stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Delay state length when role = source
    pub source_pass_delay: Duration,
    /// Delay state length when role = destination
    pub destination_pass_delay: Duration,
    /// Gap between consecutive submissions within a pass
    pub between_submissions: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            source_pass_delay: Duration::from_secs(60),
            destination_pass_delay: Duration::from_secs(30),
            between_submissions: Duration::from_millis(1500),
        }
    }
}

impl PacingConfig {
    pub fn delay_for(&self, role: ChainRole) -> Duration {
        match role {
            ChainRole::Source => self.source_pass_delay,
            ChainRole::Destination => self.destination_pass_delay,
        }
    }
}

/// Pass state machine stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Init,
    Delay,
    Scan,
    Relay,
    Done,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Init => "init",
            PassState::Delay => "delay",
            PassState::Scan => "scan",
            PassState::Relay => "relay",
            PassState::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// A chain and the contract the warden talks to on it
#[derive(Clone)]
pub struct RelaySide {
    pub chain: Arc<dyn ChainHandle>,
    pub descriptor: ContractDescriptor,
}

/// Everything a pass needs once `Init` has resolved it
pub struct PassContext {
    pub role: ChainRole,
    /// Chain scanned for events
    pub own: RelaySide,
    /// Chain receiving the mirrored calls
    pub counterpart: RelaySide,
}

/// What happened to one scanned event
#[derive(Debug)]
pub struct EventOutcome {
    pub event: RelayEvent,
    pub result: Result<SubmissionResult, RelayError>,
}

impl EventOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of one pass
#[derive(Debug)]
pub struct PassReport {
    pub role: ChainRole,
    pub range: BlockRange,
    /// Events returned by the scan
    pub found: usize,
    pub outcomes: Vec<EventOutcome>,
    pub skipped_blocks: Vec<u64>,
    pub undecodable: usize,
    /// Shutdown stopped the relay loop before every event was attempted
    pub interrupted: bool,
}

impl PassReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Every event relayed and every block read
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
            && self.skipped_blocks.is_empty()
            && self.undecodable == 0
            && !self.interrupted
    }
}

/// Passes run by one process invocation
#[derive(Debug, Default)]
pub struct CycleReport {
    pub passes: Vec<PassReport>,
    /// Passes that never reached `Done`
    pub aborted: Vec<(ChainRole, RelayError)>,
}

impl CycleReport {
    fn record(&mut self, role: ChainRole, result: Result<PassReport, RelayError>) {
        match result {
            Ok(report) => self.passes.push(report),
            Err(e) => self.aborted.push((role, e)),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.aborted.is_empty() && self.passes.iter().all(PassReport::is_clean)
    }
}

/// Drives relay passes for either direction
pub struct RelayOrchestrator {
    relay: RelayConfig,
    connector: Arc<dyn ChainConnector>,
    store: Arc<dyn DescriptorStore>,
    cancel: CancellationToken,
}

impl RelayOrchestrator {
    pub fn new(
        relay: RelayConfig,
        connector: Arc<dyn ChainConnector>,
        store: Arc<dyn DescriptorStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            relay,
            connector,
            store,
            cancel,
        }
    }

    /// Run the given roles in order, or concurrently when configured.
    /// A pass that aborts does not prevent the others from running.
    pub async fn run_cycle(&self, roles: &[ChainRole]) -> CycleReport {
        let mut report = CycleReport::default();

        match roles {
            [first, second] if self.relay.concurrent_passes => {
                let (a, b) = tokio::join!(self.run_pass(*first), self.run_pass(*second));
                report.record(*first, a);
                report.record(*second, b);
            }
            _ => {
                for role in roles {
                    let result = self.run_pass(*role).await;
                    report.record(*role, result);
                }
            }
        }

        report
    }

    /// One full pass for `role`.
    ///
    /// Errors are returned only when the pass cannot reach the relay stage:
    /// a bad descriptor, an unreachable chain, a failed bulk scan or shutdown.
    pub async fn run_pass(&self, role: ChainRole) -> Result<PassReport, RelayError> {
        let result = self.drive_pass(role).await;
        if let Err(e) = &result {
            error!(
                role = %role,
                error = %e,
                error_kind = e.kind(),
                "Relay pass aborted"
            );
        }
        result
    }

    async fn drive_pass(&self, role: ChainRole) -> Result<PassReport, RelayError> {
        check(&self.cancel)?;

        enter(role, PassState::Init);
        let ctx = self.init(role).await?;

        enter(role, PassState::Delay);
        sleep_or_cancel(&self.cancel, self.relay.pacing.delay_for(role)).await?;

        enter(role, PassState::Scan);
        let scanner = EventScanner::new(ctx.own.chain.as_ref(), &self.relay.scan, self.cancel.clone());
        let height = scanner.latest_height().await?;
        let range = BlockRange::trailing(height, self.relay.scan_window);
        let kind = role.event_kind();
        let scan = scanner
            .scan(ctx.own.descriptor.address(), kind, range)
            .await?;

        for height in &scan.skipped_blocks {
            warn!(
                role = %role,
                chain = %ctx.own.chain.name(),
                block = *height,
                event = %kind,
                "Block skipped; its events were not relayed"
            );
        }

        enter(role, PassState::Relay);
        let mut report = PassReport {
            role,
            range,
            found: scan.events.len(),
            outcomes: Vec::with_capacity(scan.events.len()),
            skipped_blocks: scan.skipped_blocks,
            undecodable: scan.undecodable,
            interrupted: false,
        };
        self.relay_events(&ctx, scan.events, &mut report).await;

        enter(role, PassState::Done);
        info!(
            role = %role,
            range = %report.range,
            found = report.found,
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped_blocks = report.skipped_blocks.len(),
            interrupted = report.interrupted,
            "Relay pass complete"
        );

        Ok(report)
    }

    /// Resolve own and counterpart chain handles and descriptors.
    pub async fn init(&self, role: ChainRole) -> Result<PassContext, RelayError> {
        let counterpart_role = role.counterpart();

        let own_descriptor = self.store.load(role)?;
        let counterpart_descriptor = self.store.load(counterpart_role)?;

        let own_chain = self.connector.connect(role).await?;
        let counterpart_chain = self.connector.connect(counterpart_role).await?;

        debug!(
            role = %role,
            contract = %own_descriptor.address(),
            counterpart_contract = %counterpart_descriptor.address(),
            signer = %counterpart_descriptor.account(),
            "Pass initialized"
        );

        Ok(PassContext {
            role,
            own: RelaySide {
                chain: own_chain,
                descriptor: own_descriptor,
            },
            counterpart: RelaySide {
                chain: counterpart_chain,
                descriptor: counterpart_descriptor,
            },
        })
    }

    async fn relay_events(&self, ctx: &PassContext, events: Vec<RelayEvent>, report: &mut PassReport) {
        let submitter = TransactionSubmitter::new(
            self.relay.gas,
            self.relay.receipt_timeout,
            self.cancel.clone(),
        );
        let target = &ctx.counterpart;

        for (idx, event) in events.into_iter().enumerate() {
            let paced = if idx == 0 {
                check(&self.cancel)
            } else {
                sleep_or_cancel(&self.cancel, self.relay.pacing.between_submissions).await
            };
            if paced.is_err() {
                report.interrupted = true;
                break;
            }

            let call = event.mirrored_call();
            let result = submitter
                .submit(&call, &target.descriptor, target.chain.as_ref())
                .await;

            match &result {
                Ok(submission) => info!(
                    role = %ctx.role,
                    event = %event.kind(),
                    block = event.block_number(),
                    log_index = event.log_index(),
                    source_tx = %event.tx_hash(),
                    call = call.name(),
                    chain = %target.chain.name(),
                    tx_hash = %submission.tx_hash,
                    confirmed_block = submission.confirmed_block_number,
                    "Event relayed"
                ),
                Err(e) => error!(
                    role = %ctx.role,
                    event = %event.kind(),
                    block = event.block_number(),
                    log_index = event.log_index(),
                    source_tx = %event.tx_hash(),
                    call = call.name(),
                    amount = %call.amount(),
                    chain = %target.chain.name(),
                    error = %e,
                    error_kind = e.kind(),
                    "Event relay failed"
                ),
            }

            let cancelled = matches!(result, Err(RelayError::Cancelled));
            report.outcomes.push(EventOutcome { event, result });
            if cancelled {
                report.interrupted = true;
                break;
            }
        }
    }
}

fn enter(role: ChainRole, state: PassState) {
    debug!(role = %role, state = %state, "Pass state");
}
