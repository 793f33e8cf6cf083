//! Durable key-value persistence for the bodega session engine.
//!
//! This crate provides:
//! - The [`TokenStore`] trait, the asynchronous storage contract
//! - A JSON-file backend ([`FileTokenStore`]) used on device
//! - [`SessionVault`], the typed high-level API the engine talks to

mod file;
mod keys;
mod traits;
mod vault;

pub use file::FileTokenStore;
pub use keys::StorageKeys;
pub use traits::TokenStore;
pub use vault::{SessionVault, UserProfile};

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create a [`SessionVault`] backed by a JSON file at the given path.
pub fn open_file_vault(path: std::path::PathBuf) -> SessionVault {
    SessionVault::new(Box::new(FileTokenStore::new(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// In-memory storage for testing
    pub struct MemoryStore {
        data: std::sync::Mutex<std::collections::HashMap<String, String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                data: std::sync::Mutex::new(std::collections::HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl TokenStore for MemoryStore {
        async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            let mut data = self.data.lock().unwrap();
            data.insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            let data = self.data.lock().unwrap();
            Ok(data.get(key).cloned())
        }

        async fn remove(&self, key: &str) -> StorageResult<bool> {
            let mut data = self.data.lock().unwrap();
            Ok(data.remove(key).is_some())
        }
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();

        // Test set and get
        store.set("test_key", "test_value").await.unwrap();
        assert_eq!(
            store.get("test_key").await.unwrap(),
            Some("test_value".to_string())
        );

        // Test has
        assert!(store.has("test_key").await.unwrap());
        assert!(!store.has("nonexistent").await.unwrap());

        // Test remove
        assert!(store.remove("test_key").await.unwrap());
        assert!(!store.remove("test_key").await.unwrap());
        assert_eq!(store.get("test_key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_vault_token_pair() {
        let vault = SessionVault::new(Box::new(MemoryStore::new()));

        assert!(!vault.has_session().await.unwrap());

        vault.set_token_pair("acc-1", Some("ref-1")).await.unwrap();
        assert_eq!(vault.access_token().await.unwrap(), Some("acc-1".to_string()));
        assert_eq!(vault.refresh_token().await.unwrap(), Some("ref-1".to_string()));
        assert!(vault.has_session().await.unwrap());

        // No rotation: refresh token stays
        vault.set_token_pair("acc-2", None).await.unwrap();
        assert_eq!(vault.access_token().await.unwrap(), Some("acc-2".to_string()));
        assert_eq!(vault.refresh_token().await.unwrap(), Some("ref-1".to_string()));
    }

    #[tokio::test]
    async fn test_vault_cached_user_roundtrip() {
        let vault = SessionVault::new(Box::new(MemoryStore::new()));

        assert!(vault.cached_user().await.unwrap().is_none());

        let user: UserProfile = serde_json::from_value(serde_json::json!({
            "id": "user-1",
            "name": "Amina",
            "phone": "+2547000000",
            "loyaltyPoints": 120
        }))
        .unwrap();

        vault.set_cached_user(&user).await.unwrap();

        let loaded = vault.cached_user().await.unwrap().unwrap();
        assert_eq!(loaded.id, "user-1");
        assert_eq!(loaded.name.as_deref(), Some("Amina"));
        // Unknown fields round-trip through `extra`
        assert_eq!(
            loaded.extra.get("loyaltyPoints"),
            Some(&serde_json::json!(120))
        );
    }

    #[tokio::test]
    async fn test_vault_first_time_flag() {
        let vault = SessionVault::new(Box::new(MemoryStore::new()));

        // Absent means first run
        assert!(vault.is_first_time_user().await.unwrap());

        vault.set_first_time_complete().await.unwrap();
        assert!(!vault.is_first_time_user().await.unwrap());
    }

    #[tokio::test]
    async fn test_vault_clear_session_keeps_device_keys() {
        let vault = SessionVault::new(Box::new(MemoryStore::new()));

        vault.set_token_pair("acc", Some("ref")).await.unwrap();
        vault.set_push_token("ExponentPushToken[xyz]").await.unwrap();
        vault.set_first_time_complete().await.unwrap();
        let install_id = vault.ensure_installation_id().await.unwrap();

        vault.clear_session().await;

        assert_eq!(vault.access_token().await.unwrap(), None);
        assert_eq!(vault.refresh_token().await.unwrap(), None);
        assert!(vault.cached_user().await.unwrap().is_none());
        // Device properties survive
        assert_eq!(
            vault.push_token().await.unwrap(),
            Some("ExponentPushToken[xyz]".to_string())
        );
        assert!(!vault.is_first_time_user().await.unwrap());
        assert_eq!(vault.ensure_installation_id().await.unwrap(), install_id);
    }

    #[tokio::test]
    async fn test_vault_clear_all() {
        let vault = SessionVault::new(Box::new(MemoryStore::new()));

        vault.set_token_pair("acc", Some("ref")).await.unwrap();
        vault.set_push_token("tok").await.unwrap();
        vault.ensure_installation_id().await.unwrap();

        vault.clear_all().await;

        assert_eq!(vault.access_token().await.unwrap(), None);
        assert_eq!(vault.push_token().await.unwrap(), None);
        assert!(vault.is_first_time_user().await.unwrap());
    }

    #[tokio::test]
    async fn test_vault_installation_id_is_stable() {
        let vault = SessionVault::new(Box::new(MemoryStore::new()));

        let first = vault.ensure_installation_id().await.unwrap();
        let second = vault.ensure_installation_id().await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_storage_keys_constants() {
        // Verify all storage keys are defined and non-empty
        let keys = vec![
            StorageKeys::ACCESS_TOKEN,
            StorageKeys::REFRESH_TOKEN,
            StorageKeys::USER_DATA,
            StorageKeys::IS_FIRST_TIME_USER,
            StorageKeys::EXPO_PUSH_TOKEN,
            StorageKeys::DEVICE_INSTALLATION_ID,
        ];
        for key in &keys {
            assert!(!key.is_empty());
        }

        // Verify keys are unique
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }
}
