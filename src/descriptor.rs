//! Contract descriptor store
//!
//! A descriptor binds a role to its bridge contract address and the key the
//! warden signs with when submitting to that contract. The stored ABI is
//! checked against the compiled bindings at load time; logs and calldata are
//! then encoded through the bindings. Descriptors are read once per pass from
//! a JSON file shaped like:
//!
//! ```json
//! {
//!   "source":      { "address": "0x..", "abi": [..], "private_key": "0x.." },
//!   "destination": { "address": "0x..", "abi": [..], "private_key": "0x..", "warden_key": "0x.." }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy::json_abi::JsonAbi;
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use serde::Deserialize;

use crate::contracts::bridge::AbiRequirement;
use crate::error::RelayError;
use crate::redact::Redacted;
use crate::types::ChainRole;

/// Raw descriptor entry as stored on disk
#[derive(Clone, Deserialize)]
pub struct DescriptorEntry {
    pub address: String,
    pub abi: serde_json::Value,
    pub private_key: Redacted<String>,
    /// Optional key used only for submissions against this contract
    #[serde(default)]
    pub warden_key: Option<Redacted<String>>,
}

impl fmt::Debug for DescriptorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorEntry")
            .field("address", &self.address)
            .field("private_key", &self.private_key)
            .field("warden_key", &self.warden_key)
            .finish()
    }
}

/// Validated, immutable contract descriptor for one role
#[derive(Clone)]
pub struct ContractDescriptor {
    role: ChainRole,
    address: Address,
    signer: PrivateKeySigner,
}

impl ContractDescriptor {
    /// Build and validate a descriptor.
    ///
    /// `signing_key` is the key used for submissions to this contract: the
    /// entry's `warden_key` when present, otherwise its `private_key`.
    pub fn new(
        role: ChainRole,
        address: &str,
        abi: &JsonAbi,
        signing_key: &str,
    ) -> Result<Self, RelayError> {
        let address = Address::from_str(address.trim()).map_err(|e| {
            RelayError::Config(format!("{} contract address is invalid: {}", role, e))
        })?;

        AbiRequirement::for_role(role)
            .check(abi)
            .map_err(|e| RelayError::Config(format!("{} contract: {}", role, e)))?;

        let signer = parse_private_key(signing_key)
            .map_err(|e| RelayError::Config(format!("{} signing key: {}", role, e)))?;

        Ok(Self {
            role,
            address,
            signer,
        })
    }

    /// Build from a stored entry
    pub fn from_entry(role: ChainRole, entry: &DescriptorEntry) -> Result<Self, RelayError> {
        let abi: JsonAbi = serde_json::from_value(entry.abi.clone()).map_err(|e| {
            RelayError::Config(format!("{} contract ABI does not parse: {}", role, e))
        })?;
        let key = entry.warden_key.as_ref().unwrap_or(&entry.private_key);

        Self::new(role, &entry.address, &abi, key.expose())
    }

    pub fn role(&self) -> ChainRole {
        self.role
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Account that signs submissions against this contract
    pub fn account(&self) -> Address {
        self.signer.address()
    }

    /// Wallet for local signing; key material stays in-process
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl fmt::Debug for ContractDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractDescriptor")
            .field("role", &self.role)
            .field("address", &self.address)
            .field("account", &self.account())
            .field("signer", &Redacted(()))
            .finish()
    }
}

/// Parse a hex private key (with or without 0x prefix)
fn parse_private_key(raw: &str) -> Result<PrivateKeySigner, String> {
    let trimmed = raw.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(hex_part).map_err(|_| "key is not valid hex".to_string())?;
    if bytes.len() != 32 {
        return Err(format!("key must be 32 bytes, got {}", bytes.len()));
    }
    PrivateKeySigner::from_slice(&bytes).map_err(|e| format!("key is not a valid secp256k1 scalar: {}", e))
}

/// Source of contract descriptors, keyed by role
pub trait DescriptorStore: Send + Sync {
    fn load(&self, role: ChainRole) -> Result<ContractDescriptor, RelayError>;
}

/// Descriptor store backed by a JSON document
#[derive(Debug, Clone)]
pub struct JsonDescriptorStore {
    origin: String,
    entries: HashMap<String, DescriptorEntry>,
}

impl JsonDescriptorStore {
    /// Read the store from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            RelayError::Config(format!(
                "failed to read contract info {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&raw, path.display().to_string())
    }

    /// Parse the store from a JSON string
    pub fn parse(raw: &str, origin: impl Into<String>) -> Result<Self, RelayError> {
        let origin = origin.into();
        let entries: HashMap<String, DescriptorEntry> = serde_json::from_str(raw)
            .map_err(|e| RelayError::Config(format!("contract info {} is invalid: {}", origin, e)))?;
        Ok(Self { origin, entries })
    }
}

/// Descriptor store that re-reads its JSON file on every load, so a missing
/// or malformed file only fails the pass that asked for it
#[derive(Debug, Clone)]
pub struct FileDescriptorStore {
    path: PathBuf,
}

impl FileDescriptorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DescriptorStore for FileDescriptorStore {
    fn load(&self, role: ChainRole) -> Result<ContractDescriptor, RelayError> {
        JsonDescriptorStore::from_path(&self.path)?.load(role)
    }
}

impl DescriptorStore for JsonDescriptorStore {
    fn load(&self, role: ChainRole) -> Result<ContractDescriptor, RelayError> {
        let entry = self.entries.get(role.as_str()).ok_or_else(|| {
            RelayError::Config(format!("contract info {} has no `{}` entry", self.origin, role))
        })?;
        ContractDescriptor::from_entry(role, entry)
    }
}
