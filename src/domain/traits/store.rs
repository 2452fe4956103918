use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Credential store - abstraction for auth state persistence.
/// The credential value is opaque to the bot.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing was saved yet (fresh pairing).
    async fn load(&self) -> Result<Option<serde_json::Value>, StorageError>;
    async fn save(&self, creds: &serde_json::Value) -> Result<(), StorageError>;
}
