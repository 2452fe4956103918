//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Core business objects (InboundMessage, Command, Session)
//! - Traits: Abstractions for infrastructure (Bot, Connector, CredentialStore, ScriptRunner)

pub mod entities;
pub mod traits;
