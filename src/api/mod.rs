//! REST client for the PreciseOptics backend.
//!
//! `ApiClient` wraps one `reqwest::Client`, the configured base URL, and the
//! injected `AuthSession`. Every request carries `Authorization: Token …`
//! when a token is held; every 401 clears it through the session.

mod auth;
mod client;
mod resources;
mod types;

pub use auth::LoginOutcome;
pub use client::{ApiClient, RawResponse};
pub use resources::Resource;
pub use types::{record_id, ListEnvelope};

#[cfg(test)]
pub(crate) mod test_support;
