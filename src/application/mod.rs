//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Session supervision and command execution
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing, replies, dispatching

pub mod errors;
pub mod services;
pub mod messaging;
