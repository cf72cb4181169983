//! Relay Core Domain
//!
//! Pure domain types shared by the relay service and its feed connectors.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

pub use entities::{BookDelta, ExchangeId, LevelChange, PairId, Side, SubscriptionTarget};
pub use values::{Price, Quantity};
