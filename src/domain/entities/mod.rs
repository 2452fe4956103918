//! Domain entities - Core business objects with no external dependencies

pub mod command;
pub mod message;
pub mod session;

pub use command::Command;
pub use message::{AddressingMode, InboundMessage, MessageBody, MessageKey};
pub use session::{ConnectionUpdate, DisconnectReason, Phase, Session, LOGGED_OUT_STATUS};
