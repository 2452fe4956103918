//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Credential persistence
//! - Process: External script execution
//! - Pairing: QR rendering for device pairing
//! - Adapters: Transport integrations (WhatsApp bridge, console)

pub mod config;
pub mod storage;
pub mod process;
pub mod pairing;
pub mod adapters;
