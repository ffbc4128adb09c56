use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;

use super::types::ListEnvelope;
use crate::config::ClientConfig;
use crate::error::{field_errors_from_body, message_from_body, ApiError};
use crate::session::AuthSession;

/// HTTP client for the clinic backend.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Arc<AuthSession>,
    timeout: Duration,
}

/// Status and decoded body of a completed (non-401) request.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert a non-success response into `ApiError::Backend` using the
    /// generic extraction order: `message`, `error`, `detail`, field map.
    pub fn into_result(self) -> Result<Value, ApiError> {
        if self.is_success() {
            return Ok(self.body);
        }
        let message = message_from_body(&self.body, "message")
            .or_else(|| message_from_body(&self.body, "error"))
            .or_else(|| field_errors_from_body(&self.body))
            .unwrap_or_else(|| {
                format!(
                    "Request failed with status {}",
                    self.status.as_u16()
                )
            });
        if self.status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(message));
        }
        Err(ApiError::Backend {
            status: self.status.as_u16(),
            message,
        })
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<AuthSession>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            session,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the body, without judging the status
    /// beyond the global 401 rule.
    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<RawResponse, ApiError> {
        let mut builder = self.http.request(method.clone(), self.url(path));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder, &method, path).await
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<RawResponse, ApiError> {
        let builder = match self.session.authorization_header() {
            Some(header) => builder.header(reqwest::header::AUTHORIZATION, header),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!(
                    "{method} {path} timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                tracing::error!(%method, path, error = %e, "Request did not reach backend");
                ApiError::from_reqwest(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }

        let text = response.text().await.map_err(ApiError::from_reqwest)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                // Non-JSON error pages still need a status-based error.
                Err(_) if !status.is_success() => Value::String(text),
                Err(e) => return Err(ApiError::Decode(format!("{method} {path}: {e}"))),
            }
        };

        tracing::debug!(%method, path, status = status.as_u16(), "Backend responded");
        Ok(RawResponse { status, body })
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.send_raw(Method::GET, path, query, None)
            .await?
            .into_result()
    }

    /// GET a list endpoint, accepting both list shapes.
    pub async fn list(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Value>, ApiError> {
        let body = self.get_json(path, query).await?;
        let envelope: ListEnvelope<Value> = serde_json::from_value(body)
            .map_err(|e| ApiError::Decode(format!("GET {path}: expected a list: {e}")))?;
        Ok(envelope.into_items())
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.send_raw(Method::POST, path, &[], Some(body))
            .await?
            .into_result()
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.send_raw(Method::PUT, path, &[], Some(body))
            .await?
            .into_result()
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_raw(Method::DELETE, path, &[], None)
            .await?
            .into_result()
            .map(|_| ())
    }
}
