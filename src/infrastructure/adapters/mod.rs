//! Platform adapters

pub mod bridge;
pub mod console;

pub use bridge::{BridgeConnector, BridgeSettings};
pub use console::{ConsoleAdapter, ConsoleConnector};
