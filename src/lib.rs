pub mod api;
pub mod config;
pub mod error;
pub mod eye_tests;
pub mod forms;
pub mod session;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub use api::{ApiClient, LoginOutcome};
pub use error::{ApiError, ErrorKind};
pub use session::AuthSession;

/// Install the fmt subscriber, honouring `RUST_LOG` when set. Safe to call
/// more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Client configured from the environment, with the session persisted in
/// the user's data directory.
pub fn connect() -> Result<ApiClient, ApiError> {
    let config = config::ClientConfig::from_env()?;
    let store = session::FileSessionStore::default_location();
    tracing::info!(
        "{} client v{} using {}",
        config::APP_NAME,
        config::APP_VERSION,
        config.base_url
    );
    let session = Arc::new(AuthSession::load(Box::new(store))?);
    ApiClient::new(&config, session)
}
