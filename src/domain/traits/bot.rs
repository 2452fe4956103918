use async_trait::async_trait;
use crate::domain::entities::MessageKey;
use crate::application::errors::BotError;

/// Bot trait - outbound side of a messaging platform adapter
#[async_trait]
pub trait Bot: Send + Sync {
    /// Send `text` to `to` as a reply quoting the message identified by `quoted`.
    /// Returns the platform's id for the sent message.
    async fn send_reply(&self, to: &str, text: &str, quoted: &MessageKey) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub platform: String,
}

/// Shows a pairing code to the operator
pub trait PairingDisplay: Send + Sync {
    fn show(&self, code: &str);
}
