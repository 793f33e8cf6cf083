//! Single-flight token refresh coordination.
//!
//! However many requests fail with a 401 at once, at most one refresh call
//! is ever in flight. The first caller installs a shared future under a
//! synchronous lock; everyone arriving while it runs awaits that same
//! future and receives the same outcome. A failed refresh is terminal:
//! the session is torn down and no retry is attempted.

use crate::auth_api::AuthApi;
use crate::state::SessionHandle;
use crate::transport::TransportSet;
use crate::ApiError;
use bodega_storage::SessionVault;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a refresh did not produce a new access token.
///
/// Cloneable so every waiter on the shared refresh future receives it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefreshFailure {
    /// No refresh token in the store; silent renewal is impossible
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint rejected the token
    #[error("refresh rejected: {0}")]
    Rejected(String),

    /// The refresh call never got a response (network failure or timeout)
    #[error("refresh failed: {0}")]
    Network(String),
}

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

/// Coordinates token refreshes across concurrent requests.
pub struct RefreshCoordinator {
    vault: Arc<SessionVault>,
    transports: Arc<TransportSet>,
    state: Arc<SessionHandle>,
    auth: Arc<AuthApi>,
    in_flight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new(
        vault: Arc<SessionVault>,
        transports: Arc<TransportSet>,
        state: Arc<SessionHandle>,
        auth: Arc<AuthApi>,
    ) -> Self {
        Self {
            vault,
            transports,
            state,
            auth,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.lock().unwrap().is_some()
    }

    /// Obtain a fresh access token, joining the in-flight refresh if one
    /// exists. The check-and-set on the latch happens under the lock, so
    /// two near-simultaneous callers can never both start a refresh.
    pub async fn refresh(&self) -> Result<String, RefreshFailure> {
        let shared = {
            let mut slot = self.in_flight.lock().unwrap();
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining refresh already in flight");
                    existing.clone()
                }
                None => {
                    let fut = Self::drive(
                        self.vault.clone(),
                        self.transports.clone(),
                        self.state.clone(),
                        self.auth.clone(),
                        Arc::clone(&self.in_flight),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        shared.await
    }

    /// The single refresh execution backing the shared future. Settles the
    /// latch before returning so the next expiry starts a new refresh.
    async fn drive(
        vault: Arc<SessionVault>,
        transports: Arc<TransportSet>,
        state: Arc<SessionHandle>,
        auth: Arc<AuthApi>,
        in_flight: Arc<Mutex<Option<SharedRefresh>>>,
    ) -> Result<String, RefreshFailure> {
        state.note_refreshing();

        let result = Self::attempt(&vault, &transports, &state, &auth).await;

        if let Err(e) = &result {
            warn!(error = %e, "Refresh failed, tearing session down");
            vault.clear_session().await;
            state.force_unauthenticated();
            transports.refresh_auth_headers(&vault).await;
        }

        *in_flight.lock().unwrap() = None;
        result
    }

    async fn attempt(
        vault: &SessionVault,
        transports: &TransportSet,
        state: &SessionHandle,
        auth: &AuthApi,
    ) -> Result<String, RefreshFailure> {
        let refresh_token = match vault.refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(RefreshFailure::MissingRefreshToken),
            Err(e) => {
                warn!(error = %e, "Could not read refresh token, treating as absent");
                return Err(RefreshFailure::MissingRefreshToken);
            }
        };

        info!("Refreshing access token");

        let payload = auth.refresh(&refresh_token).await.map_err(|e| match &e {
            ApiError::Network(_) | ApiError::Timeout => RefreshFailure::Network(e.to_string()),
            _ => RefreshFailure::Rejected(e.to_string()),
        })?;

        let access_token = payload.tokens.access_token.clone();

        // The rotated refresh token is optional; absent means keep the old one
        if let Err(e) = vault
            .set_token_pair(&access_token, payload.tokens.refresh_token.as_deref())
            .await
        {
            warn!(error = %e, "Could not persist refreshed tokens, continuing in memory");
        }

        state.mark_authenticated(&access_token);
        transports.refresh_auth_headers(vault).await;

        info!("Access token refreshed");
        Ok(access_token)
    }
}
