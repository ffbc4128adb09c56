//! Token login, two-factor completion, logout, and reset-link requests.

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiClient, Resource};
use crate::error::{message_from_body, ApiError};

/// Result of a username/password login.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Token stored in the session.
    LoggedIn,
    /// Backend wants a TOTP code before it issues a token.
    TwoFactorRequired { user_id: Value },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    requires_2fa: bool,
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default)]
    staff_profile: Option<Value>,
}

impl ApiClient {
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let body = json!({ "username": username, "password": password });
        let raw = self
            .send_raw(Method::POST, Resource::TokenAuth.path(), &[], Some(&body))
            .await?;

        if !raw.is_success() {
            return Err(ApiError::Backend {
                status: raw.status.as_u16(),
                message: message_from_body(&raw.body, "error")
                    .unwrap_or_else(|| "Login failed".to_string()),
            });
        }

        let parsed: TokenResponse = serde_json::from_value(raw.body)
            .map_err(|e| ApiError::Decode(format!("login response: {e}")))?;

        if parsed.requires_2fa {
            tracing::info!(username, "Login requires two-factor verification");
            return Ok(LoginOutcome::TwoFactorRequired {
                user_id: parsed.user_id.unwrap_or(Value::Null),
            });
        }

        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Decode("login response carried no token".into()))?;

        let user_data = parsed
            .user
            .or_else(|| Some(json!({ "username": username })));
        self.session().establish(&token, user_data, parsed.staff_profile)?;
        tracing::info!(username, "Logged in");
        Ok(LoginOutcome::LoggedIn)
    }

    /// Finish a login that returned [`LoginOutcome::TwoFactorRequired`].
    pub async fn verify_two_factor_login(
        &self,
        user_id: &Value,
        username: &str,
        password: &str,
        code: &str,
    ) -> Result<(), ApiError> {
        let code = code.trim();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::Validation("Please enter a 6-digit code".into()));
        }

        let body = json!({
            "user_id": user_id,
            "username": username,
            "password": password,
            "code": code,
        });
        let raw = self
            .send_raw(Method::POST, Resource::TwoFactorVerifyLogin.path(), &[], Some(&body))
            .await?;

        if !raw.is_success() {
            return Err(ApiError::Backend {
                status: raw.status.as_u16(),
                message: message_from_body(&raw.body, "error")
                    .unwrap_or_else(|| "Invalid verification code".to_string()),
            });
        }

        let parsed: TokenResponse = serde_json::from_value(raw.body)
            .map_err(|e| ApiError::Decode(format!("2FA response: {e}")))?;
        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Decode("2FA response carried no token".into()))?;

        self.session().establish(&token, parsed.user, parsed.staff_profile)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        tracing::info!("Logging out");
        self.session().clear()
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        if email.trim().is_empty() {
            return Err(ApiError::Validation("Email is required".into()));
        }
        self.post_json(Resource::PasswordResetRequest.path(), &json!({ "email": email.trim() }))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::api::test_support::{client_for, spawn_backend};
    use crate::session::AuthSession;

    #[tokio::test]
    async fn login_stores_token_and_user() {
        let app = Router::new().route(
            "/api-token-auth/",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["username"], "drpatel");
                Json(json!({"token": "t-1", "user": {"id": 5, "username": "drpatel"}}))
            }),
        );
        let (base, server) = spawn_backend(app).await;
        let session = Arc::new(AuthSession::in_memory());
        let client = client_for(&base, session.clone());

        let outcome = client.login("drpatel", "pw").await.unwrap();

        assert_eq!(outcome, LoginOutcome::LoggedIn);
        assert_eq!(session.token().as_deref(), Some("t-1"));
        assert_eq!(session.user_data().unwrap()["id"], 5);
        server.abort();
    }

    #[tokio::test]
    async fn login_reports_two_factor() {
        let app = Router::new().route(
            "/api-token-auth/",
            post(|| async { Json(json!({"requires_2fa": true, "user_id": 9})) }),
        );
        let (base, server) = spawn_backend(app).await;
        let session = Arc::new(AuthSession::in_memory());
        let client = client_for(&base, session.clone());

        let outcome = client.login("u", "p").await.unwrap();

        assert_eq!(outcome, LoginOutcome::TwoFactorRequired { user_id: json!(9) });
        assert!(!session.is_authenticated());
        server.abort();
    }

    #[tokio::test]
    async fn login_failure_uses_error_key() {
        let app = Router::new().route(
            "/api-token-auth/",
            post(|| async {
                (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid credentials"})))
            }),
        );
        let (base, server) = spawn_backend(app).await;
        let client = client_for(&base, Arc::new(AuthSession::in_memory()));

        let err = client.login("u", "bad").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
        server.abort();
    }

    #[tokio::test]
    async fn two_factor_code_validated_before_request() {
        // No backend: a request would fail with a network error instead.
        let client = client_for("http://127.0.0.1:9", Arc::new(AuthSession::in_memory()));
        let err = client
            .verify_two_factor_login(&json!(1), "u", "p", "12ab")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Please enter a 6-digit code");
    }

    #[tokio::test]
    async fn two_factor_success_stores_profile() {
        let app = Router::new().route(
            "/2fa/verify-login/",
            post(|| async {
                Json(json!({
                    "token": "t-2",
                    "user": {"username": "u"},
                    "staff_profile": {"department": "Glaucoma"}
                }))
            }),
        );
        let (base, server) = spawn_backend(app).await;
        let session = Arc::new(AuthSession::in_memory());
        let client = client_for(&base, session.clone());

        client
            .verify_two_factor_login(&json!(1), "u", "p", "123456")
            .await
            .unwrap();

        assert_eq!(session.token().as_deref(), Some("t-2"));
        assert_eq!(session.staff_profile().unwrap()["department"], "Glaucoma");
        server.abort();
    }

    #[test]
    fn logout_clears_session() {
        let session = Arc::new(AuthSession::in_memory());
        session.establish("t", None, None).unwrap();
        let client = client_for("http://127.0.0.1:9", session.clone());
        client.logout().unwrap();
        assert!(!session.is_authenticated());
    }
}
