//! File-based credential storage

use async_trait::async_trait;
use std::path::PathBuf;

use crate::application::errors::StorageError;
use crate::domain::traits::CredentialStore;

const CREDS_FILE: &str = "creds.json";

/// Keeps the auth state as `creds.json` inside a folder (`auth_info` by default)
pub struct FileCredentialStore {
    base_path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn creds_path(&self) -> PathBuf {
        self.base_path.join(CREDS_FILE)
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<serde_json::Value>, StorageError> {
        let content = match tokio::fs::read_to_string(self.creds_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, creds: &serde_json::Value) -> Result<(), StorageError> {
        self.init().await?;
        let data = serde_json::to_vec_pretty(creds)?;

        // Write-then-rename so a crash never leaves half a file behind.
        let tmp = self.base_path.join(format!("{}.tmp", CREDS_FILE));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, self.creds_path()).await?;
        tracing::debug!("Saved credentials to {}", self.creds_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_creds_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("auth_info"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("auth_info"));
        let creds = json!({ "noiseKey": { "private": "abc" }, "registered": true });

        store.save(&creds).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(creds));
        assert!(!dir.path().join("auth_info/creds.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_every_update_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        store.save(&json!({ "v": 1 })).await.unwrap();
        store.save(&json!({ "v": 2 })).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(json!({ "v": 2 })));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("creds.json"), "{not json").unwrap();
        let store = FileCredentialStore::new(dir.path());
        assert!(matches!(store.load().await, Err(StorageError::Serialization(_))));
    }
}
