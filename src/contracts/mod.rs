//! Bridge contract bindings
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the two halves
//! of the bridge: the source contract (holds deposits, pays withdrawals) and
//! the destination contract (mints wrapped tokens, burns on unwrap).

pub mod bridge;

pub use bridge::{DestinationBridge, SourceBridge};
