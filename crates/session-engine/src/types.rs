//! Data types shared across the session engine.

use bodega_storage::UserProfile;
use serde::Serialize;

/// Login credentials. Transient; never persisted beyond the request that
/// uses them.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    /// Phone number (the login identifier)
    pub phone: &'a str,
    /// Password
    pub password: &'a str,
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An access token and its optional refresh token.
///
/// The refresh token may be absent: the session is then degraded and cannot
/// be silently renewed.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Registration details sent to the signup endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SignupProfile {
    pub name: String,
    pub phone: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Successful login or signup result.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// User profile, when the backend included one in its response.
    pub user: Option<UserProfile>,
}

/// Logout result. Logout never fails from the caller's perspective; this
/// only reports whether the backend was told.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoutOutcome {
    pub backend_notified: bool,
}
