//! Bridge Warden - Library interface
//!
//! Re-exports internal modules for use in integration tests.

pub mod chain;
pub mod config;
pub mod contracts;
pub mod descriptor;
pub mod error;
pub mod gas;
pub mod orchestrator;
pub mod redact;
pub mod scanner;
pub mod shutdown;
pub mod submitter;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::RelayError;
pub use orchestrator::{CycleReport, PassReport, RelayOrchestrator};
pub use types::ChainRole;
