//! In-process backend for HTTP-level tests.

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;

use super::ApiClient;
use crate::config::ClientConfig;
use crate::session::AuthSession;

/// Serve `app` on an ephemeral localhost port. Returns the base URL and
/// the server task (abort it when done).
pub(crate) async fn spawn_backend(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), server)
}

pub(crate) fn client_for(base_url: &str, session: Arc<AuthSession>) -> ApiClient {
    ApiClient::new(&ClientConfig::new(base_url, 5), session).unwrap()
}
