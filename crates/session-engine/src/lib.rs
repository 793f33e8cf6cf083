//! Session and token lifecycle management for the bodega client.
//!
//! This crate provides:
//! - Observable session state backed by an explicit lifecycle FSM
//! - Transport registry with Authorization header synchronization
//! - A request pipeline that recovers expired access tokens transparently
//! - Single-flight token refresh coordination
//! - Login, signup, and logout orchestration with push-binding upkeep

mod auth_api;
mod error;
mod extract;
mod pipeline;
mod push;
mod refresh;
mod session;
mod session_fsm;
mod state;
mod transport;
mod types;

pub use auth_api::{AuthApi, AuthPayload};
pub use error::{
    ApiError, ApiResult, GENERIC_ERROR_MESSAGE, NETWORK_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE,
};
pub use extract::{ACCESS_TOKEN_PATHS, MESSAGE_PATHS, REFRESH_TOKEN_PATHS, USER_PATHS};
pub use pipeline::{ApiPipeline, ApiResponse, RequestSpec};
pub use push::PushGateway;
pub use refresh::{RefreshCoordinator, RefreshFailure};
pub use session::{SessionManager, API_TRANSPORT, UPLOAD_TRANSPORT};
pub use session_fsm::session_machine;
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase};
pub use state::{SessionEvent, SessionHandle, SessionSnapshot};
pub use transport::{Transport, TransportSet};
pub use types::{Credentials, LoginOutcome, LogoutOutcome, SignupProfile, TokenPair};

// Convenience re-export: the cached profile type lives with the vault
pub use bodega_storage::UserProfile;
