//! The request pipeline for authenticated domain calls.
//!
//! Every request passes through fixed stages: attach-auth, dispatch,
//! classify, maybe-refresh, maybe-retry. The stage order is what keeps the
//! failure handling honest: connectivity errors surface untouched, a 401
//! with no refresh token tears the session down without ever calling the
//! refresh endpoint, and a recoverable 401 is hidden from the caller
//! entirely by a refresh-and-replay.

use crate::refresh::RefreshCoordinator;
use crate::state::SessionHandle;
use crate::transport::{Transport, TransportSet};
use crate::{ApiError, ApiResult};
use bodega_storage::SessionVault;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A rebuildable description of an outbound request. Rebuildability is
/// what makes the transparent replay after a refresh possible.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut spec = Self::new(Method::POST, path);
        spec.body = Some(body);
        spec
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        let mut spec = Self::new(Method::PUT, path);
        spec.body = Some(body);
        spec
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        let mut spec = Self::new(Method::PATCH, path);
        spec.body = Some(body);
        spec
    }

    fn is_mutating(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }
}

/// A successful response: status plus parsed JSON body (`Null` when the
/// backend sent nothing).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Deserialize the body into a typed value.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

/// Executes domain requests with token attachment and 401 recovery.
pub struct ApiPipeline {
    transport: Arc<Transport>,
    transports: Arc<TransportSet>,
    vault: Arc<SessionVault>,
    state: Arc<SessionHandle>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiPipeline {
    pub fn new(
        transport: Arc<Transport>,
        transports: Arc<TransportSet>,
        vault: Arc<SessionVault>,
        state: Arc<SessionHandle>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            transports,
            vault,
            state,
            refresher,
        }
    }

    /// Execute a request. A recoverable 401 is resolved internally; the
    /// caller sees either the replayed request's outcome or a terminal
    /// [`ApiError::AuthInvalid`].
    pub async fn execute(&self, spec: &RequestSpec) -> ApiResult<ApiResponse> {
        match self.dispatch(spec).await {
            Err(e) if e.is_expired_token() => self.recover(spec).await,
            other => other,
        }
    }

    /// attach-auth + dispatch + classify.
    async fn dispatch(&self, spec: &RequestSpec) -> ApiResult<ApiResponse> {
        let mut builder = self.transport.request(spec.method.clone(), &spec.path);

        // The freshest stored token wins over whatever default header the
        // transport currently carries
        match self.vault.access_token().await {
            Ok(Some(token)) => {
                builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Could not read access token, sending without");
            }
        }

        if spec.is_mutating() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Malformed(e.to_string()))?
        };

        Ok(ApiResponse { status, body })
    }

    /// maybe-refresh + maybe-retry, entered only on a 401.
    async fn recover(&self, spec: &RequestSpec) -> ApiResult<ApiResponse> {
        // Terminal case first: with no refresh token there is nothing to
        // recover with, and no refresh call may be made
        let has_refresh_token = match self.vault.refresh_token().await {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Could not read refresh token, treating as absent");
                false
            }
        };

        if !has_refresh_token {
            debug!(path = %spec.path, "401 with no refresh token, signing out");
            self.force_sign_out().await;
            return Err(ApiError::AuthInvalid);
        }

        match self.refresher.refresh().await {
            Ok(_) => {
                debug!(path = %spec.path, "Replaying request with refreshed token");
                match self.dispatch(spec).await {
                    Err(e) if e.is_expired_token() => {
                        // A brand-new token was rejected: terminal, do not
                        // refresh again
                        warn!(path = %spec.path, "Fresh token rejected, signing out");
                        self.force_sign_out().await;
                        Err(ApiError::AuthInvalid)
                    }
                    other => other,
                }
            }
            Err(e) => {
                // The coordinator already tore the session down
                debug!(path = %spec.path, error = %e, "Refresh failed, request rejected");
                Err(ApiError::AuthInvalid)
            }
        }
    }

    async fn force_sign_out(&self) {
        self.vault.clear_session().await;
        self.state.force_unauthenticated();
        self.transports.refresh_auth_headers(&self.vault).await;
    }
}
