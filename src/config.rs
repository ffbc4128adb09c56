use std::path::PathBuf;
use std::time::Duration;

use crate::error::ApiError;

/// Application-level constants
pub const APP_NAME: &str = "PreciseOptics";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Development backend address.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Per-request timeout when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where an expired or rejected token sends the user.
pub const LOGIN_PATH: &str = "/login";

pub const ENV_API_URL: &str = "PRECISE_OPTICS_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "PRECISE_OPTICS_TIMEOUT_SECS";

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "precise_optics=info,warn"
}

/// Get the application data directory (~/PreciseOptics/).
/// Falls back to the current directory when no home is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// File holding the persisted session (token + profile blobs).
pub fn session_file() -> PathBuf {
    app_data_dir().join("session.json")
}

/// Connection settings for [`crate::api::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ApiError::Config(format!(
                    "{ENV_API_URL} must be an http(s) URL, got '{url}'"
                )));
            }
            config.base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("{ENV_TIMEOUT_SECS} must be a number of seconds"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
