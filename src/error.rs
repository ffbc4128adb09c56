//! Client-side error types.
//!
//! Every failure a page can hit folds into one of three inline-message kinds:
//! validation (caught before any request), backend (the API answered with a
//! 4xx/5xx), and network (the request never completed).

use serde_json::Value;
use thiserror::Error;

/// Generic text shown when a request never reached the server.
pub const NETWORK_FALLBACK_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("All eye-test sources failed")]
    AllSourcesFailed,

    #[error("Response parsing error: {0}")]
    Decode(String),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// The three inline-message categories a page distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Backend,
    Network,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Network(_) | ApiError::AllSourcesFailed => ErrorKind::Network,
            ApiError::Backend { .. }
            | ApiError::Unauthorized
            | ApiError::NotFound(_)
            | ApiError::Decode(_)
            | ApiError::Session(_)
            | ApiError::Config(_) => ErrorKind::Backend,
        }
    }

    /// Text to render inline next to the form or view.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(message)
            | ApiError::Backend { message, .. }
            | ApiError::NotFound(message) => message.clone(),
            ApiError::Network(_) => NETWORK_FALLBACK_MESSAGE.to_string(),
            ApiError::Unauthorized => "Your session has expired. Please log in again.".into(),
            ApiError::AllSourcesFailed => "Failed to load eye tests".into(),
            other => other.to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_timeout() {
            ApiError::Network(format!("Request timed out: {err}"))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Pull a human-readable message out of a backend error body.
///
/// `key` names the field the resource's contract uses (`message` or
/// `error`); `detail` is the backend framework's own default key and is
/// always tried last.
pub fn message_from_body(body: &Value, key: &str) -> Option<String> {
    [key, "detail"]
        .iter()
        .filter_map(|k| body.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
}

/// Flatten a field-keyed validation body (`{"email": ["taken"]}`) into
/// `field: msg, msg; field: msg`.
pub fn field_errors_from_body(body: &Value) -> Option<String> {
    let map = body.as_object()?;
    if map.is_empty() {
        return None;
    }
    let parts: Vec<String> = map
        .iter()
        .map(|(field, messages)| {
            let text = match messages {
                Value::Array(items) => items
                    .iter()
                    .map(value_text)
                    .collect::<Vec<_>>()
                    .join(", "),
                other => value_text(other),
            };
            format!("{field}: {text}")
        })
        .collect();
    Some(parts.join("; "))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
