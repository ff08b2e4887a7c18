use eyre::{eyre, Result, WrapErr};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::chain::rpc_fallback::parse_rpc_urls;
use crate::gas::GasEstimator;
use crate::orchestrator::PacingConfig;
use crate::scanner::{ScanConfig, ScanMode};
use crate::types::ChainRole;

/// Main configuration for the warden
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the contract descriptor store
    pub contract_info_path: PathBuf,
    pub source: ChainConfig,
    pub destination: ChainConfig,
    pub relay: RelayConfig,
    pub log_format: LogFormat,
}

/// Per-role RPC endpoint configuration
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Additional RPC URLs for read fallback (tried in order when primary fails)
    pub rpc_fallback_urls: Vec<String>,
    pub receipt_poll_interval: Duration,
}

impl ChainConfig {
    /// All RPC URLs: primary followed by fallbacks.
    pub fn all_rpc_urls(&self) -> Vec<String> {
        let mut urls = vec![self.rpc_url.clone()];
        urls.extend(self.rpc_fallback_urls.iter().cloned());
        urls
    }
}

/// Relay pipeline tuning
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Trailing block window scanned each pass
    pub scan_window: u64,
    pub scan: ScanConfig,
    pub gas: GasEstimator,
    pub pacing: PacingConfig,
    pub receipt_timeout: Duration,
    /// Run the source and destination passes concurrently
    pub concurrent_passes: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(eyre!("LOG_FORMAT must be `pretty` or `json`, got `{}`", other)),
        }
    }
}

/// Default functions
fn default_contract_info_path() -> PathBuf {
    PathBuf::from("contract_info.json")
}

fn default_scan_window() -> u64 {
    5
}

fn default_scan_max_retries() -> u32 {
    5
}

fn default_scan_backoff_cap_secs() -> u64 {
    10
}

fn default_source_pass_delay_secs() -> u64 {
    60
}

fn default_destination_pass_delay_secs() -> u64 {
    30
}

fn default_submission_pacing_ms() -> u64 {
    1500
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

fn default_gas_fallback_limit() -> u64 {
    200_000
}

fn default_gas_margin_percent() -> u64 {
    20
}

/// Read an optional env var, parsing it when set.
/// A value that is present but malformed is an error, not the default.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("{} has an invalid value `{}`: {}", name, raw, e)),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let contract_info_path = env::var("CONTRACT_INFO_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_contract_info_path());

        let receipt_poll_interval = Duration::from_millis(env_or(
            "RECEIPT_POLL_INTERVAL_MS",
            default_receipt_poll_interval_ms(),
        )?);

        let source = load_chain_config(ChainRole::Source, receipt_poll_interval)?;
        let destination = load_chain_config(ChainRole::Destination, receipt_poll_interval)?;

        let scan_mode: ScanMode = env_or("SCAN_MODE", ScanMode::PerBlock)?;

        let relay = RelayConfig {
            scan_window: env_or("SCAN_WINDOW", default_scan_window())?,
            scan: ScanConfig {
                mode: scan_mode,
                max_retries: env_or("SCAN_MAX_RETRIES", default_scan_max_retries())?,
                backoff_cap: Duration::from_secs(env_or(
                    "SCAN_BACKOFF_CAP_SECS",
                    default_scan_backoff_cap_secs(),
                )?),
            },
            gas: GasEstimator {
                margin_percent: env_or("GAS_MARGIN_PERCENT", default_gas_margin_percent())?,
                fallback_limit: env_or("GAS_FALLBACK_LIMIT", default_gas_fallback_limit())?,
            },
            pacing: PacingConfig {
                source_pass_delay: Duration::from_secs(env_or(
                    "SOURCE_PASS_DELAY_SECS",
                    default_source_pass_delay_secs(),
                )?),
                destination_pass_delay: Duration::from_secs(env_or(
                    "DESTINATION_PASS_DELAY_SECS",
                    default_destination_pass_delay_secs(),
                )?),
                between_submissions: Duration::from_millis(env_or(
                    "SUBMISSION_PACING_MS",
                    default_submission_pacing_ms(),
                )?),
            },
            receipt_timeout: Duration::from_secs(env_or(
                "RECEIPT_TIMEOUT_SECS",
                default_receipt_timeout_secs(),
            )?),
            concurrent_passes: env_or("RELAY_CONCURRENT_PASSES", false)?,
        };

        let config = Config {
            contract_info_path,
            source,
            destination,
            relay,
            log_format: env_or("LOG_FORMAT", LogFormat::Pretty)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn chain(&self, role: ChainRole) -> &ChainConfig {
        match role {
            ChainRole::Source => &self.source,
            ChainRole::Destination => &self.destination,
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        for role in ChainRole::ALL {
            let chain = self.chain(role);
            if chain.rpc_url.is_empty() {
                return Err(eyre!("{} rpc_url cannot be empty", role));
            }
            if chain.receipt_poll_interval.is_zero() {
                return Err(eyre!("RECEIPT_POLL_INTERVAL_MS must be greater than 0"));
            }
        }

        if self.relay.scan.max_retries == 0 {
            return Err(eyre!("SCAN_MAX_RETRIES must be at least 1"));
        }

        if self.relay.gas.fallback_limit == 0 {
            return Err(eyre!("GAS_FALLBACK_LIMIT must be greater than 0"));
        }

        if self.relay.receipt_timeout.is_zero() {
            return Err(eyre!("RECEIPT_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }
}

/// `SOURCE_RPC_URL` / `DESTINATION_RPC_URL`, comma-separated with fallbacks
fn load_chain_config(role: ChainRole, receipt_poll_interval: Duration) -> Result<ChainConfig> {
    let var = format!("{}_RPC_URL", role.as_str().to_uppercase());
    let raw = env::var(&var).map_err(|_| eyre!("{} environment variable is required", var))?;
    let urls = parse_rpc_urls(&raw);
    if urls.is_empty() {
        return Err(eyre!("{} cannot be empty", var));
    }

    Ok(ChainConfig {
        rpc_url: urls[0].clone(),
        rpc_fallback_urls: urls[1..].to_vec(),
        receipt_poll_interval,
    })
}
