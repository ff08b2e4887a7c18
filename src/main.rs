//! Bridge Warden
//!
//! Mirrors bridge events between a source and a destination EVM chain:
//! `Deposit` on the source chain becomes `wrap` on the destination chain,
//! `Unwrap` on the destination chain becomes `withdraw` on the source chain.
//!
//! Each invocation runs one relay cycle and exits:
//!
//! ```text
//! bridge-warden [source|destination|all]
//! ```
//!
//! The exit status is non-zero when any pass aborted, any event failed to
//! relay or any block could not be read.

use std::process::ExitCode;
use std::sync::Arc;

use eyre::eyre;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use warden::chain::EvmConnector;
use warden::config::{Config, LogFormat};
use warden::descriptor::FileDescriptorStore;
use warden::{ChainRole, CycleReport, RelayOrchestrator};

fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<ExitCode> {
    let roles = parse_roles(std::env::args().nth(1).as_deref())?;
    let config = Config::load()?;
    init_logging(config.log_format);

    info!(
        roles = ?roles,
        source_rpc = %config.source.rpc_url,
        destination_rpc = %config.destination.rpc_url,
        contract_info = %config.contract_info_path.display(),
        scan_window = config.relay.scan_window,
        scan_mode = %config.relay.scan.mode,
        "Starting Bridge Warden"
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        trigger.cancel();
    });

    let orchestrator = RelayOrchestrator::new(
        config.relay.clone(),
        Arc::new(EvmConnector::new(&config)),
        Arc::new(FileDescriptorStore::new(&config.contract_info_path)),
        cancel,
    );

    let cycle = orchestrator.run_cycle(&roles).await;
    log_summary(&cycle);

    Ok(if cycle.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_roles(arg: Option<&str>) -> eyre::Result<Vec<ChainRole>> {
    match arg.map(str::trim) {
        None | Some("all") => Ok(ChainRole::ALL.to_vec()),
        Some(raw) => raw
            .parse::<ChainRole>()
            .map(|role| vec![role])
            .map_err(|e| eyre!("{} (usage: bridge-warden [source|destination|all])", e)),
    }
}

fn log_summary(cycle: &CycleReport) {
    for pass in &cycle.passes {
        info!(
            role = %pass.role,
            range = %pass.range,
            found = pass.found,
            succeeded = pass.succeeded(),
            failed = pass.failed(),
            skipped_blocks = ?pass.skipped_blocks,
            undecodable = pass.undecodable,
            interrupted = pass.interrupted,
            "Pass summary"
        );
    }
    for (role, e) in &cycle.aborted {
        error!(role = %role, error = %e, error_kind = e.kind(), "Pass did not complete");
    }
    if !cycle.is_clean() {
        warn!("Relay cycle finished with failures; see above for events needing reconciliation");
    }
}

fn init_logging(format: LogFormat) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,warden=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).init(),
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling relay cycle");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling relay cycle");
        }
    }
}
