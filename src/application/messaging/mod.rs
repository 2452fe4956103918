//! Message handling - Command parsing, replies and dispatching

pub mod dispatcher;
pub mod parser;
pub mod replies;

pub use dispatcher::{CommandDispatcher, DispatchOutcome, DispatchSettings, SharedDispatcher};
pub use parser::{CommandParser, DEFAULT_SUBMISSION};
