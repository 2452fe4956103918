//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod connector;
pub mod runner;
pub mod store;

pub use bot::{Bot, BotInfo, PairingDisplay};
pub use connector::{Connection, Connector, SessionEvent};
pub use runner::{ScriptInvocation, ScriptRunner};
pub use store::CredentialStore;
