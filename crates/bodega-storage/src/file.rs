//! File-backed token store.

use crate::{StorageError, StorageResult, TokenStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Token store persisted as a single JSON object on disk.
///
/// Writes go through a temp file and an atomic rename so a crash mid-write
/// never leaves a torn store behind. All operations serialize on an internal
/// mutex; read-modify-write cycles on the same key cannot interleave.
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Create a store backed by the given file. The file (and its parent
    /// directory) is created lazily on first write.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> StorageResult<HashMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StorageError::Encoding(format!("corrupt store file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let map = self.read_map().await?;
        Ok(map.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        let existed = map.remove(key).is_some();
        if existed {
            self.write_map(&map).await?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("session.json"));

        store.set("access_token", "tok-1").await.unwrap();
        assert_eq!(
            store.get("access_token").await.unwrap(),
            Some("tok-1".to_string())
        );

        assert!(store.remove("access_token").await.unwrap());
        assert!(!store.remove("access_token").await.unwrap());
        assert_eq!(store.get("access_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_missing_file_is_absent() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nope.json"));

        assert_eq!(store.get("anything").await.unwrap(), None);
        assert!(!store.has("anything").await.unwrap());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let store = FileTokenStore::new(path.clone());
            store.set("refresh_token", "r-1").await.unwrap();
        }

        let reopened = FileTokenStore::new(path);
        assert_eq!(
            reopened.get("refresh_token").await.unwrap(),
            Some("r-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dirs").join("session.json");
        let store = FileTokenStore::new(path);

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json {{{").unwrap();

        let store = FileTokenStore::new(path);
        let result = store.get("k").await;
        assert!(matches!(result, Err(StorageError::Encoding(_))));
    }
}
