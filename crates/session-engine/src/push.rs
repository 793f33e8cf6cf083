//! Push-notification device binding.
//!
//! Binds this device's push token to the signed-in user on the backend.
//! The binding exists only while a session does: it is registered after a
//! successful login or signup and removed before logout teardown. Both
//! directions are best-effort from the lifecycle's point of view.

use crate::transport::Transport;
use crate::{ApiError, ApiResult};
use bodega_storage::SessionVault;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const DEVICE_TOKEN_PATH: &str = "/notifications/device-token";

/// Client for the device-token binding endpoint.
pub struct PushGateway {
    transport: Arc<Transport>,
    vault: Arc<SessionVault>,
}

impl PushGateway {
    pub fn new(transport: Arc<Transport>, vault: Arc<SessionVault>) -> Self {
        Self { transport, vault }
    }

    /// Bind the stored push token to the current user. Requires the
    /// transport's Authorization header to be synchronized already. A
    /// missing push token is a quiet no-op: not every device grants
    /// notification permission.
    pub async fn register(&self) -> ApiResult<()> {
        let token = match self.vault.push_token().await? {
            Some(token) => token,
            None => {
                debug!("No push token stored, skipping registration");
                return Ok(());
            }
        };

        let installation_id = self.vault.ensure_installation_id().await?;
        let body = json!({
            "deviceToken": token,
            "installationId": installation_id,
        });

        let response = self
            .transport
            .request(Method::POST, DEVICE_TOKEN_PATH)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &text));
        }

        info!("Push binding registered");
        Ok(())
    }

    /// Remove this device's binding. Called on logout before the tokens
    /// are cleared.
    pub async fn unregister(&self) -> ApiResult<()> {
        let token = match self.vault.push_token().await? {
            Some(token) => token,
            None => {
                debug!("No push token stored, nothing to unregister");
                return Ok(());
            }
        };

        let response = self
            .transport
            .request(Method::DELETE, DEVICE_TOKEN_PATH)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "deviceToken": token }))
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &text));
        }

        info!("Push binding removed");
        Ok(())
    }
}
