use serde_json::Value;

use super::draft::FormDraft;
use super::kinds::{ErrorStyle, FormKind};
use super::validation::build_payload;
use crate::api::{ApiClient, RawResponse};
use crate::error::{field_errors_from_body, message_from_body, ApiError};

/// What a page does after a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub message: &'static str,
    pub redirect: String,
    /// Decoded response body (the created or updated record).
    pub record: Value,
}

/// Validate and send `draft` for `kind`.
///
/// Validation failures return before any request is made. The draft is
/// only borrowed, so the caller keeps every entered value on failure.
pub async fn submit_form(
    client: &ApiClient,
    kind: &FormKind,
    draft: &FormDraft,
) -> Result<SubmitOutcome, ApiError> {
    let payload = build_payload(kind, draft).inspect_err(|e| {
        tracing::debug!(form = ?kind, error = %e, "Form rejected before submit");
    })?;

    let path = kind.path();
    let raw = client
        .send_raw(kind.method(), &path, &[], Some(&payload))
        .await?;

    if !raw.is_success() {
        let err = rejection(kind, &raw);
        tracing::warn!(form = ?kind, status = raw.status.as_u16(), "Form submission rejected");
        return Err(err);
    }

    tracing::info!(form = ?kind, path = %path, "Form submitted");
    Ok(SubmitOutcome {
        message: kind.success_message(),
        redirect: kind.redirect(),
        record: raw.body,
    })
}

fn rejection(kind: &FormKind, raw: &RawResponse) -> ApiError {
    let extracted = match kind.error_style() {
        ErrorStyle::Message => message_from_body(&raw.body, "message"),
        ErrorStyle::Error => message_from_body(&raw.body, "error"),
        ErrorStyle::FieldMap => field_errors_from_body(&raw.body),
    };
    ApiError::Backend {
        status: raw.status.as_u16(),
        message: extracted.unwrap_or_else(|| kind.fallback_message().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{post, put};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::api::test_support::{client_for, spawn_backend};
    use crate::error::ErrorKind;
    use crate::session::AuthSession;

    #[tokio::test]
    async fn invalid_audit_json_sends_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/api/audit-logs/",
                post(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::CREATED, Json(json!({"id": 1})))
                }),
            )
            .with_state(hits.clone());
        let (base, server) = spawn_backend(app).await;
        let client = client_for(&base, Arc::new(AuthSession::in_memory()));

        let mut draft = FormKind::AddAuditLog.seed();
        draft.set("changes", "{invalid");
        let err = submit_form(&client, &FormKind::AddAuditLog, &draft)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Changes field must contain valid JSON");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(draft.text("changes"), "{invalid");

        server.abort();
    }

    #[tokio::test]
    async fn payload_is_draft_plus_seeds() {
        let app = Router::new().route(
            "/api/patients/",
            post(|Json(body): Json<Value>| async move { (StatusCode::CREATED, Json(body)) }),
        );
        let (base, server) = spawn_backend(app).await;
        let client = client_for(&base, Arc::new(AuthSession::in_memory()));

        let kind = FormKind::AddPatient;
        let mut draft = kind.seed();
        draft.set("first_name", "Ada");
        draft.set("last_name", "Obi");

        let outcome = submit_form(&client, &kind, &draft).await.unwrap();

        assert_eq!(outcome.record, draft.to_json());
        assert_eq!(outcome.message, "Patient added successfully!");
        assert_eq!(outcome.redirect, "/patients");

        server.abort();
    }

    #[tokio::test]
    async fn backend_message_surfaces_and_draft_survives() {
        let app = Router::new().route(
            "/api/medications/:id/",
            put(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"message": "Batch number already used"})),
                )
            }),
        );
        let (base, server) = spawn_backend(app).await;
        let client = client_for(&base, Arc::new(AuthSession::in_memory()));

        let kind = FormKind::EditMedication { medication_id: "9".into() };
        let mut draft = kind.seed();
        draft.set("batch_number", "B-1");

        let err = submit_form(&client, &kind, &draft).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.user_message(), "Batch number already used");
        assert_eq!(draft.text("batch_number"), "B-1");

        server.abort();
    }

    #[tokio::test]
    async fn fallback_when_body_has_no_message() {
        let app = Router::new().route(
            "/api/treatments/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let (base, server) = spawn_backend(app).await;
        let client = client_for(&base, Arc::new(AuthSession::in_memory()));

        let kind = FormKind::AddTreatment { patient_id: "p1".into() };
        let err = submit_form(&client, &kind, &kind.seed()).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to create treatment. Please try again.");

        server.abort();
    }

    #[tokio::test]
    async fn staff_field_errors_joined() {
        let app = Router::new().route(
            "/staff/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"username": ["A user with that username already exists."]})),
                )
            }),
        );
        let (base, server) = spawn_backend(app).await;
        let client = client_for(&base, Arc::new(AuthSession::in_memory()));

        let mut draft = FormKind::AddStaff.seed();
        for (k, v) in [
            ("username", "jdoe"),
            ("email", "jdoe@clinic.org"),
            ("first_name", "Jo"),
            ("last_name", "Doe"),
            ("employee_id", "E-1"),
            ("department", "Cornea"),
            ("password", "password123"),
            ("password_confirm", "password123"),
        ] {
            draft.set(k, v);
        }

        let err = submit_form(&client, &FormKind::AddStaff, &draft)
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "username: A user with that username already exists."
        );

        server.abort();
    }

    #[tokio::test]
    async fn reset_password_posts_token_and_uses_error_key() {
        let app = Router::new().route(
            "/password-reset/confirm/",
            post(|Json(body): Json<Value>| async move {
                if body["token"] == "good" {
                    (StatusCode::OK, Json(json!({"status": "ok"})))
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({"error": "Token expired"})))
                }
            }),
        );
        let (base, server) = spawn_backend(app).await;
        let client = client_for(&base, Arc::new(AuthSession::in_memory()));

        let good = FormKind::ResetPassword { token: Some("good".into()) };
        let mut draft = good.seed();
        draft.set("password", "newpassword");
        draft.set("confirmPassword", "newpassword");

        let outcome = submit_form(&client, &good, &draft).await.unwrap();
        assert_eq!(outcome.redirect, "/login");

        let stale = FormKind::ResetPassword { token: Some("stale".into()) };
        let err = submit_form(&client, &stale, &draft).await.unwrap_err();
        assert_eq!(err.user_message(), "Token expired");

        server.abort();
    }

    #[tokio::test]
    async fn unauthorized_submit_clears_session() {
        let app = Router::new().route(
            "/api/diagnoses/",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let (base, server) = spawn_backend(app).await;
        let session = Arc::new(AuthSession::in_memory());
        session.establish("tok", None, None).unwrap();
        let client = client_for(&base, session.clone());

        let kind = FormKind::AddDiagnosis { patient_id: "p1".into() };
        let err = submit_form(&client, &kind, &kind.seed()).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert!(session.token().is_none());
        assert_eq!(session.pending_login_redirect(), Some("/login"));

        server.abort();
    }
}
