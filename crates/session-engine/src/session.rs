//! Session lifecycle operations.
//!
//! [`SessionManager`] owns the vault, the transports, the observable
//! session state, and the refresh coordinator, and orchestrates every
//! lifecycle operation in dependency order: token store writes, then
//! session state, then transport header sync, then anything that issues
//! authenticated requests. No other code path writes tokens.

use crate::auth_api::{AuthApi, AuthPayload};
use crate::pipeline::ApiPipeline;
use crate::push::PushGateway;
use crate::refresh::RefreshCoordinator;
use crate::state::SessionHandle;
use crate::transport::{Transport, TransportSet};
use crate::types::{Credentials, LoginOutcome, LogoutOutcome, SignupProfile};
use crate::{ApiError, ApiResult};
use bodega_config_and_utils::Config;
use bodega_storage::{SessionVault, TokenStore};
use reqwest::header::{HeaderValue, ACCEPT};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the JSON API transport.
pub const API_TRANSPORT: &str = "api";
/// Name of the upload transport (multipart bodies, no JSON defaults).
pub const UPLOAD_TRANSPORT: &str = "upload";

/// Owns the session and every collaborator that touches it.
pub struct SessionManager {
    vault: Arc<SessionVault>,
    state: Arc<SessionHandle>,
    transports: Arc<TransportSet>,
    auth: Arc<AuthApi>,
    push: Arc<PushGateway>,
    refresher: Arc<RefreshCoordinator>,
    pipeline: Arc<ApiPipeline>,
}

impl SessionManager {
    /// Build a manager from configuration and a storage backend.
    pub fn new(config: &Config, store: Box<dyn TokenStore>) -> ApiResult<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(format!("could not build HTTP client: {}", e)))?;

        let vault = Arc::new(SessionVault::new(store));
        let state = Arc::new(SessionHandle::new());

        let transports = Arc::new(TransportSet::new());
        let api = Arc::new(Transport::new(API_TRANSPORT, client.clone(), &base_url));
        api.set_default_header(ACCEPT, HeaderValue::from_static("application/json"));
        let upload = Arc::new(Transport::new(UPLOAD_TRANSPORT, client.clone(), &base_url));
        transports.register(api.clone());
        transports.register(upload);

        let auth = Arc::new(AuthApi::new(client, &base_url));
        let refresher = Arc::new(RefreshCoordinator::new(
            vault.clone(),
            transports.clone(),
            state.clone(),
            auth.clone(),
        ));
        let push = Arc::new(PushGateway::new(api.clone(), vault.clone()));
        let pipeline = Arc::new(ApiPipeline::new(
            api,
            transports.clone(),
            vault.clone(),
            state.clone(),
            refresher.clone(),
        ));

        Ok(Self {
            vault,
            state,
            transports,
            auth,
            push,
            refresher,
            pipeline,
        })
    }

    /// Hydrate the session from storage and synchronize transport headers.
    /// Runs at process start; calling it again changes nothing.
    pub async fn initialize(&self) {
        self.state.hydrate(&self.vault).await;
        self.transports.refresh_auth_headers(&self.vault).await;
    }

    /// Sign in with phone and password.
    pub async fn login(&self, phone: &str, password: &str) -> ApiResult<LoginOutcome> {
        self.state.begin_authentication();

        let credentials = Credentials { phone, password };
        let payload = match self.auth.login(&credentials).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.state.authentication_failed();
                return Err(e);
            }
        };

        self.finish_sign_in(payload).await
    }

    /// Register a new account. On success the new account is signed in.
    pub async fn signup(&self, profile: &SignupProfile) -> ApiResult<LoginOutcome> {
        self.state.begin_authentication();

        let payload = match self.auth.signup(profile).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Signup failed");
                self.state.authentication_failed();
                return Err(e);
            }
        };

        self.finish_sign_in(payload).await
    }

    /// The shared tail of login and signup: persist, publish, sync
    /// headers, then bind push notifications.
    async fn finish_sign_in(&self, payload: AuthPayload) -> ApiResult<LoginOutcome> {
        let access_token = payload.tokens.access_token.clone();

        if let Err(e) = self
            .vault
            .set_token_pair(&access_token, payload.tokens.refresh_token.as_deref())
            .await
        {
            // The in-memory session still proceeds; it just won't survive
            // a restart
            warn!(error = %e, "Could not persist tokens");
        }

        if let Some(user) = &payload.user {
            if let Err(e) = self.vault.set_cached_user(user).await {
                warn!(error = %e, "Could not cache user profile");
            }
        }

        self.state.mark_authenticated(&access_token);
        if let Some(user) = payload.user.clone() {
            self.state.set_user(user);
        }

        self.transports.refresh_auth_headers(&self.vault).await;

        if let Err(e) = self.push.register().await {
            warn!(error = %e, "Push registration failed, continuing");
        }

        info!("Signed in");
        Ok(LoginOutcome { user: payload.user })
    }

    /// Sign out. Infallible from the caller's perspective: the backend
    /// calls are best-effort and local teardown always completes.
    pub async fn logout(&self) -> LogoutOutcome {
        self.state.begin_sign_out();

        if let Err(e) = self.push.unregister().await {
            warn!(error = %e, "Push unregistration failed, continuing");
        }

        let mut backend_notified = false;
        match self.vault.refresh_token().await {
            Ok(Some(refresh_token)) => match self.auth.logout(&refresh_token).await {
                Ok(()) => backend_notified = true,
                Err(e) => {
                    warn!(error = %e, "Backend logout failed, clearing local session anyway");
                }
            },
            Ok(None) => debug!("No refresh token, skipping backend logout"),
            Err(e) => warn!(error = %e, "Could not read refresh token, skipping backend logout"),
        }

        self.vault.clear_session().await;
        self.state.mark_signed_out();
        self.transports.refresh_auth_headers(&self.vault).await;

        info!(backend_notified, "Signed out");
        LogoutOutcome { backend_notified }
    }

    /// Mark the first-time flow complete without creating a session.
    pub async fn skip_auth(&self) {
        if let Err(e) = self.vault.set_first_time_complete().await {
            warn!(error = %e, "Could not persist first-time flag");
        }
        self.state.complete_first_time_flow();
    }

    /// Store the device push token handed over by the OS. The binding is
    /// created on the next login (or explicitly via the gateway).
    pub async fn set_push_token(&self, token: &str) -> ApiResult<()> {
        self.vault.set_push_token(token).await?;
        Ok(())
    }

    /// The observable session state.
    pub fn state(&self) -> Arc<SessionHandle> {
        self.state.clone()
    }

    /// The token vault.
    pub fn vault(&self) -> Arc<SessionVault> {
        self.vault.clone()
    }

    /// The transport registry.
    pub fn transports(&self) -> Arc<TransportSet> {
        self.transports.clone()
    }

    /// The pipeline domain calls go through.
    pub fn pipeline(&self) -> Arc<ApiPipeline> {
        self.pipeline.clone()
    }

    /// The refresh coordinator.
    pub fn refresher(&self) -> Arc<RefreshCoordinator> {
        self.refresher.clone()
    }

    /// The push binding gateway.
    pub fn push(&self) -> Arc<PushGateway> {
        self.push.clone()
    }
}
