//! High-level API for session persistence.

use crate::{StorageError, StorageKeys, StorageResult, TokenStore};
use serde::{Deserialize, Serialize};

/// Cached user profile.
///
/// Unknown backend fields are carried in `extra` so the cache round-trips
/// whatever the backend sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Phone number (the login identifier)
    #[serde(default)]
    pub phone: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// High-level API for storing and retrieving session data.
pub struct SessionVault {
    store: Box<dyn TokenStore>,
}

impl SessionVault {
    /// Create a new vault with the given storage backend.
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        Self { store }
    }

    // ==========================================
    // Token pair
    // ==========================================

    /// Retrieve the access token.
    pub async fn access_token(&self) -> StorageResult<Option<String>> {
        self.store.get(StorageKeys::ACCESS_TOKEN).await
    }

    /// Store the access token.
    pub async fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.store.set(StorageKeys::ACCESS_TOKEN, token).await
    }

    /// Retrieve the refresh token.
    pub async fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.store.get(StorageKeys::REFRESH_TOKEN).await
    }

    /// Store the refresh token.
    pub async fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.store.set(StorageKeys::REFRESH_TOKEN, token).await
    }

    /// Store a token pair. When the backend did not rotate the refresh
    /// token (`None`), the stored one is kept.
    pub async fn set_token_pair(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> StorageResult<()> {
        self.set_access_token(access_token).await?;
        if let Some(refresh) = refresh_token {
            self.set_refresh_token(refresh).await?;
        }
        Ok(())
    }

    /// Check whether an access token is present.
    pub async fn has_session(&self) -> StorageResult<bool> {
        self.store.has(StorageKeys::ACCESS_TOKEN).await
    }

    // ==========================================
    // Cached user profile
    // ==========================================

    /// Retrieve the cached user profile.
    pub async fn cached_user(&self) -> StorageResult<Option<UserProfile>> {
        match self.store.get(StorageKeys::USER_DATA).await? {
            Some(json) => {
                let user: UserProfile = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Cache the user profile.
    pub async fn set_cached_user(&self, user: &UserProfile) -> StorageResult<()> {
        let json =
            serde_json::to_string(user).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.store.set(StorageKeys::USER_DATA, &json).await
    }

    // ==========================================
    // First-run flag
    // ==========================================

    /// Whether this install is still in the first-time flow.
    /// Absent means the flow has never been completed.
    pub async fn is_first_time_user(&self) -> StorageResult<bool> {
        match self.store.get(StorageKeys::IS_FIRST_TIME_USER).await? {
            Some(value) => Ok(value != "false"),
            None => Ok(true),
        }
    }

    /// Mark the first-time flow as complete.
    pub async fn set_first_time_complete(&self) -> StorageResult<()> {
        self.store.set(StorageKeys::IS_FIRST_TIME_USER, "false").await
    }

    // ==========================================
    // Push binding
    // ==========================================

    /// Retrieve the device push token.
    pub async fn push_token(&self) -> StorageResult<Option<String>> {
        self.store.get(StorageKeys::EXPO_PUSH_TOKEN).await
    }

    /// Store the device push token.
    pub async fn set_push_token(&self, token: &str) -> StorageResult<()> {
        self.store.set(StorageKeys::EXPO_PUSH_TOKEN, token).await
    }

    /// Retrieve the installation id, generating and persisting one on first
    /// use. The id identifies this install to the push binding endpoint.
    pub async fn ensure_installation_id(&self) -> StorageResult<String> {
        if let Some(id) = self.store.get(StorageKeys::DEVICE_INSTALLATION_ID).await? {
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.store.set(StorageKeys::DEVICE_INSTALLATION_ID, &id).await?;
        tracing::info!("Generated new installation id");
        Ok(id)
    }

    // ==========================================
    // Teardown
    // ==========================================

    /// Clear the session (tokens and cached user).
    ///
    /// Removal failures are swallowed: logout must always complete locally.
    /// The first-run flag, push token, and installation id are device
    /// properties and survive.
    pub async fn clear_session(&self) {
        let _ = self.store.remove(StorageKeys::ACCESS_TOKEN).await;
        let _ = self.store.remove(StorageKeys::REFRESH_TOKEN).await;
        let _ = self.store.remove(StorageKeys::USER_DATA).await;
    }

    /// Clear everything, including device-level keys.
    pub async fn clear_all(&self) {
        self.clear_session().await;
        let _ = self.store.remove(StorageKeys::IS_FIRST_TIME_USER).await;
        let _ = self.store.remove(StorageKeys::EXPO_PUSH_TOKEN).await;
        let _ = self.store.remove(StorageKeys::DEVICE_INSTALLATION_ID).await;
    }
}
