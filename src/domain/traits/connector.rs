use async_trait::async_trait;
use std::sync::Arc;

use super::Bot;
use crate::application::errors::BotError;
use crate::domain::entities::{ConnectionUpdate, InboundMessage};

/// Events a live connection delivers, one at a time
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Credential state changed and must be persisted
    CredsUpdate(serde_json::Value),
    ConnectionUpdate(ConnectionUpdate),
    MessagesUpsert(Vec<InboundMessage>),
}

/// A live connection to the messaging service
#[async_trait]
pub trait Connection: Send {
    /// Next event, or `None` once the underlying transport is gone.
    async fn next_event(&mut self) -> Option<SessionEvent>;

    /// Outbound handle bound to this connection
    fn bot(&self) -> Arc<dyn Bot>;
}

/// Opens connections. Called once per session attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, creds: Option<serde_json::Value>) -> Result<Box<dyn Connection>, BotError>;
}
