//! gate-bot: relays `/gate` and `/repair` chat commands to local scripts
//! and keeps its WhatsApp session alive.

pub mod domain;
pub mod application;
pub mod infrastructure;
