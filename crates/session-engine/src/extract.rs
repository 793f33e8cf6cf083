//! Tolerant extraction of tokens, users, and messages from backend
//! response envelopes.
//!
//! The backend does not wrap responses consistently: tokens have been seen
//! at the root, under `data`, and under legacy key names. Each value is
//! looked up through an explicit ordered list of JSON pointers, first
//! non-null match wins. The breadth is deliberate; narrowing it risks
//! breaking a live backend variant.

use serde_json::Value;

/// Positions where an access token may appear, in priority order.
pub const ACCESS_TOKEN_PATHS: &[&str] = &[
    "/accessToken",
    "/data/accessToken",
    "/token",
    "/data/token",
    "/access_token",
    "/data/access_token",
];

/// Positions where a refresh token may appear, in priority order.
pub const REFRESH_TOKEN_PATHS: &[&str] = &[
    "/refreshToken",
    "/data/refreshToken",
    "/refresh_token",
    "/data/refresh_token",
];

/// Positions where the user object may appear, in priority order.
pub const USER_PATHS: &[&str] = &["/user", "/data/user"];

/// Positions where a human-readable error message may appear, in priority
/// order.
pub const MESSAGE_PATHS: &[&str] = &["/message", "/error", "/data/message"];

fn first_string_at(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| value.pointer(path).and_then(Value::as_str))
        .map(str::to_string)
}

/// Extract the access token from a response envelope.
pub fn access_token(value: &Value) -> Option<String> {
    first_string_at(value, ACCESS_TOKEN_PATHS)
}

/// Extract the refresh token from a response envelope.
pub fn refresh_token(value: &Value) -> Option<String> {
    first_string_at(value, REFRESH_TOKEN_PATHS)
}

/// Extract the user object from a response envelope.
///
/// Falls back to a bare `data` object when it looks like a profile rather
/// than a token wrapper (some registration responses return the created
/// user directly under `data`).
pub fn user_object(value: &Value) -> Option<Value> {
    for path in USER_PATHS {
        if let Some(candidate) = value.pointer(path) {
            if candidate.is_object() {
                return Some(candidate.clone());
            }
        }
    }

    if let Some(data) = value.get("data").and_then(Value::as_object) {
        let token_keys = [
            "accessToken",
            "access_token",
            "token",
            "refreshToken",
            "refresh_token",
        ];
        if data.contains_key("id") && !token_keys.iter().any(|k| data.contains_key(*k)) {
            return Some(Value::Object(data.clone()));
        }
    }

    None
}

/// Extract a human-readable error message from a response envelope.
pub fn error_message(value: &Value) -> Option<String> {
    first_string_at(value, MESSAGE_PATHS)
}
