//! Application services - Business logic orchestration

pub mod command_service;
pub mod session_service;

pub use command_service::{CommandService, ScriptSettings};
pub use session_service::{ReconnectPolicy, SessionOutcome, SessionSupervisor, SupervisorState};
