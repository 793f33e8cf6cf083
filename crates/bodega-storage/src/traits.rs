//! Storage trait definitions.

use crate::StorageResult;
use async_trait::async_trait;

/// Trait for token storage backends.
///
/// Each operation is individually atomic; there is no cross-key transaction
/// guarantee.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a value
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    async fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    async fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
