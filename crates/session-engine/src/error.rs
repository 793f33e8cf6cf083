//! API error taxonomy.

use bodega_storage::StorageError;
use reqwest::StatusCode;
use thiserror::Error;

/// Fallback user-facing message when the backend gives us nothing usable.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// User-facing message for connectivity failures.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Could not reach the server. Check your connection and try again.";

/// User-facing message when the session is gone for good.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response received at all
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request exceeded the bounded timeout
    #[error("Request timed out")]
    Timeout,

    /// 401 that may be recoverable by a token refresh
    #[error("Access token rejected")]
    AuthExpired,

    /// Terminal authentication failure; the session has been torn down
    #[error("Authentication invalid")]
    AuthInvalid,

    /// 4xx with a field-level backend message
    #[error("Validation failed (HTTP {status}): {message}")]
    Validation { status: u16, message: String },

    /// 5xx from the backend
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Anything else
    #[error("Unexpected response (HTTP {status}): {message}")]
    Unexpected { status: u16, message: String },

    /// Response body could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Map a transport-level failure. Timeouts are indistinguishable from
    /// network failures for classification purposes, but we keep the
    /// distinction for logs.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }

    /// Classify an error response by status code.
    ///
    /// 401 becomes [`ApiError::AuthExpired`]; whether that is actually
    /// recoverable is decided by the pipeline, which knows if a refresh
    /// token exists.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::AuthExpired;
        }

        let message = Self::message_from_body(body);
        match status.as_u16() {
            400..=499 => ApiError::Validation {
                status: status.as_u16(),
                message,
            },
            500..=599 => ApiError::Server {
                status: status.as_u16(),
                message,
            },
            _ => ApiError::Unexpected {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Best-effort extraction of a backend error message from a response
    /// body. Returns an empty string when nothing usable is found.
    pub(crate) fn message_from_body(body: &str) -> String {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            if let Some(message) = crate::extract::error_message(&value) {
                return message;
            }
        }

        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.len() > 200 || trimmed.starts_with('<') {
            String::new()
        } else {
            trimmed.to_string()
        }
    }

    /// True for a 401 the pipeline may try to recover from.
    pub fn is_expired_token(&self) -> bool {
        matches!(self, ApiError::AuthExpired)
    }

    /// True for any authentication failure, recoverable or terminal.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::AuthExpired | ApiError::AuthInvalid)
    }

    /// The single message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation { message, .. }
            | ApiError::Server { message, .. }
            | ApiError::Unexpected { message, .. } => {
                if message.is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            ApiError::Network(_) | ApiError::Timeout => NETWORK_ERROR_MESSAGE.to_string(),
            ApiError::AuthExpired | ApiError::AuthInvalid => SESSION_EXPIRED_MESSAGE.to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}
