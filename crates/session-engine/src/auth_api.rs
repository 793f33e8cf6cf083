//! Raw authentication endpoint calls.
//!
//! These calls deliberately bypass the request pipeline: login and signup
//! are unauthenticated, and the refresh and logout calls authenticate with
//! the refresh token itself. Keeping them out of the pipeline means a 401
//! from the refresh endpoint can never trigger another refresh.

use crate::extract;
use crate::types::{Credentials, SignupProfile, TokenPair};
use crate::{ApiError, ApiResult};
use bodega_storage::UserProfile;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

const LOGIN_PATH: &str = "/auth/login";
const SIGNUP_PATH: &str = "/auth/signup";
const REFRESH_PATH: &str = "/auth/refresh-token";
const LOGOUT_PATH: &str = "/auth/logout";

/// Tokens and optional user parsed out of an auth endpoint response.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub tokens: TokenPair,
    pub user: Option<UserProfile>,
}

/// Client for the auth endpoints.
pub struct AuthApi {
    client: Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(client: Client, base_url: &Url) -> Self {
        Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticate with phone and password.
    pub async fn login(&self, credentials: &Credentials<'_>) -> ApiResult<AuthPayload> {
        let body = json!({
            "phone": credentials.phone,
            "password": credentials.password,
        });
        let value = self.post_json(LOGIN_PATH, &body).await?;
        Self::parse_auth_payload(&value)
    }

    /// Register a new account. On success the backend logs the account in
    /// and returns tokens like login does.
    pub async fn signup(&self, profile: &SignupProfile) -> ApiResult<AuthPayload> {
        let body = serde_json::to_value(profile)
            .map_err(|e| ApiError::Malformed(format!("could not serialize profile: {}", e)))?;
        let value = self.post_json(SIGNUP_PATH, &body).await?;
        Self::parse_auth_payload(&value)
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<AuthPayload> {
        let body = json!({ "refreshToken": refresh_token });
        let value = self.post_json(REFRESH_PATH, &body).await?;
        Self::parse_auth_payload(&value)
    }

    /// Invalidate a refresh token server-side.
    pub async fn logout(&self, refresh_token: &str) -> ApiResult<()> {
        let body = json!({ "refreshToken": refresh_token });
        self.post_json(LOGOUT_PATH, &body).await?;
        Ok(())
    }

    async fn post_json(&self, path: &str, body: &Value) -> ApiResult<Value> {
        debug!(path, "Auth request");

        let response = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(path, status = %status, "Auth request failed");
            // A 401 here means bad credentials or a dead refresh token,
            // never an expired access token
            return Err(match ApiError::from_status(status, &text) {
                ApiError::AuthExpired => ApiError::Validation {
                    status: status.as_u16(),
                    message: ApiError::message_from_body(&text),
                },
                other => other,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Malformed(format!("invalid JSON from {}: {}", path, e)))
    }

    /// Read tokens and the user out of whichever envelope the backend
    /// used this time.
    fn parse_auth_payload(value: &Value) -> ApiResult<AuthPayload> {
        let access_token = extract::access_token(value).ok_or_else(|| {
            ApiError::Malformed("no access token in any known position".to_string())
        })?;
        let refresh_token = extract::refresh_token(value);

        let user = extract::user_object(value).and_then(|candidate| {
            match serde_json::from_value::<UserProfile>(candidate) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "User object in auth response was unreadable, ignoring");
                    None
                }
            }
        });

        Ok(AuthPayload {
            tokens: TokenPair {
                access_token,
                refresh_token,
            },
            user,
        })
    }
}
