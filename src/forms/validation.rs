//! Client-side checks and payload shaping, per form kind.
//!
//! Only the forms that validated before submitting do so here; every other
//! kind sends its draft as entered.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Number, Value};

use super::draft::FormDraft;
use super::kinds::FormKind;
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

static LEADING_INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?\d+").expect("valid regex"));

static LEADING_FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex")
});

/// JSON-text fields of the audit-log form and their error messages.
const AUDIT_JSON_FIELDS: [(&str, &str); 3] = [
    ("changes", "Changes field must contain valid JSON"),
    ("old_values", "Old values field must contain valid JSON"),
    ("new_values", "New values field must contain valid JSON"),
];

/// Validate `draft` for `kind` and produce the request body. Errors are
/// `ApiError::Validation` with the text the page shows.
pub fn build_payload(kind: &FormKind, draft: &FormDraft) -> Result<Value, ApiError> {
    let mut body = draft.to_map();

    match kind {
        FormKind::AddAuditLog => {
            for (field, message) in AUDIT_JSON_FIELDS {
                let text = draft.text(field);
                if text.trim().is_empty() {
                    continue;
                }
                let parsed: Value = serde_json::from_str(text)
                    .map_err(|_| ApiError::Validation(message.to_string()))?;
                body.insert(field.to_string(), parsed);
            }
        }
        FormKind::ResetPassword { token } => {
            let token = token
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ApiError::Validation("Invalid or missing reset token".into()))?;
            let password = draft.text("password");
            if password != draft.text("confirmPassword") {
                return Err(ApiError::Validation("Passwords do not match".into()));
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ApiError::Validation(format!(
                    "Password must be at least {MIN_PASSWORD_LEN} characters long"
                )));
            }
            return Ok(json!({ "token": token, "password": password }));
        }
        FormKind::EditMedication { .. } => {
            body.insert(
                "price".into(),
                float_value(parse_leading_float(draft.get("price")).unwrap_or(0.0)),
            );
            for field in ["stock_quantity", "minimum_stock_level"] {
                body.insert(
                    field.into(),
                    json!(parse_leading_int(draft.get(field)).unwrap_or(0)),
                );
            }
        }
        FormKind::AddStaff => {
            let errors = staff_errors(draft);
            if !errors.is_empty() {
                return Err(ApiError::Validation(errors.join(", ")));
            }
            body.insert(
                "years_of_experience".into(),
                json!(parse_leading_int(draft.get("years_of_experience")).unwrap_or(0)),
            );
            body.insert(
                "consultation_fee".into(),
                optional_float(draft, "consultation_fee"),
            );
        }
        FormKind::AddDiagnosis { patient_id } => {
            body.insert("patient".into(), json!(patient_id));
            null_if_blank(&mut body, draft, "onset_date");
            follow_up_date(&mut body, draft);
        }
        FormKind::AddTreatment { patient_id } => {
            body.insert("patient".into(), json!(patient_id));
            null_if_blank(&mut body, draft, "end_date");
            follow_up_date(&mut body, draft);
            body.insert("cost_estimate".into(), optional_float(draft, "cost_estimate"));
            body.insert(
                "duration_days".into(),
                if draft.flag("duration_days") {
                    parse_leading_int(draft.get("duration_days")).map_or(Value::Null, |n| json!(n))
                } else {
                    Value::Null
                },
            );
        }
        FormKind::AddPatient | FormKind::AddMedication => {}
    }

    Ok(Value::Object(body))
}

/// All staff-form problems in display order.
fn staff_errors(draft: &FormDraft) -> Vec<String> {
    const REQUIRED: [(&str, &str); 8] = [
        ("username", "Username is required"),
        ("email", "Email is required"),
        ("first_name", "First name is required"),
        ("last_name", "Last name is required"),
        ("employee_id", "Employee ID is required"),
        ("department", "Department is required"),
        ("password", "Password is required"),
        ("password_confirm", "Password confirmation is required"),
    ];

    let mut errors: Vec<String> = REQUIRED
        .iter()
        .filter(|(field, _)| !draft.flag(field))
        .map(|(_, message)| message.to_string())
        .collect();

    let password = draft.text("password");
    if password != draft.text("password_confirm") {
        errors.push("Passwords do not match".into());
    }
    if !password.is_empty() && password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    let email = draft.text("email");
    if !email.is_empty() && !EMAIL_RE.is_match(email) {
        errors.push("Please enter a valid email address".into());
    }
    errors
}

fn null_if_blank(body: &mut Map<String, Value>, draft: &FormDraft, field: &str) {
    if draft.is_blank(field) {
        body.insert(field.into(), Value::Null);
    }
}

/// `follow_up_date` is only sent when a follow-up is required.
fn follow_up_date(body: &mut Map<String, Value>, draft: &FormDraft) {
    if !draft.flag("follow_up_required") {
        body.insert("follow_up_date".into(), Value::Null);
    }
}

fn optional_float(draft: &FormDraft, field: &str) -> Value {
    if !draft.flag(field) {
        return Value::Null;
    }
    parse_leading_float(draft.get(field)).map_or(Value::Null, float_value)
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

/// Integer read the way a form field is read: numbers pass through,
/// strings contribute their leading digits, anything else is `None`.
pub fn parse_leading_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => LEADING_INT_RE
            .find(s)
            .and_then(|m| m.as_str().trim().parse().ok()),
        _ => None,
    }
}

/// Float counterpart of [`parse_leading_int`].
pub fn parse_leading_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => LEADING_FLOAT_RE
            .find(s)
            .and_then(|m| m.as_str().trim().parse().ok()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audit_draft(changes: &str) -> FormDraft {
        let mut draft = FormKind::AddAuditLog.seed();
        draft.set("action", "update");
        draft.set("changes", changes);
        draft
    }

    #[test]
    fn audit_invalid_json_rejected() {
        let err = build_payload(&FormKind::AddAuditLog, &audit_draft("{invalid")).unwrap_err();
        assert_eq!(err.user_message(), "Changes field must contain valid JSON");
    }

    #[test]
    fn audit_checks_fields_in_order() {
        let mut draft = audit_draft("");
        draft.set("old_values", "[1,");
        draft.set("new_values", "nope");
        let err = build_payload(&FormKind::AddAuditLog, &draft).unwrap_err();
        assert_eq!(err.user_message(), "Old values field must contain valid JSON");
    }

    #[test]
    fn audit_payload_carries_parsed_json() {
        let payload =
            build_payload(&FormKind::AddAuditLog, &audit_draft(r#"{"dose": "2mg"}"#)).unwrap();
        assert_eq!(payload["changes"], json!({"dose": "2mg"}));
        assert_eq!(payload["old_values"], "");
        assert_eq!(payload["request_method"], "GET");
    }

    fn reset(token: Option<&str>, password: &str, confirm: &str) -> Result<Value, ApiError> {
        let kind = FormKind::ResetPassword { token: token.map(str::to_string) };
        let mut draft = kind.seed();
        draft.set("password", password);
        draft.set("confirmPassword", confirm);
        build_payload(&kind, &draft)
    }

    #[test]
    fn reset_password_rules() {
        assert_eq!(
            reset(None, "longenough", "longenough").unwrap_err().user_message(),
            "Invalid or missing reset token"
        );
        assert_eq!(
            reset(Some("t"), "longenough", "different").unwrap_err().user_message(),
            "Passwords do not match"
        );
        assert_eq!(
            reset(Some("t"), "short", "short").unwrap_err().user_message(),
            "Password must be at least 8 characters long"
        );
        assert_eq!(
            reset(Some("t"), "longenough", "longenough").unwrap(),
            json!({"token": "t", "password": "longenough"})
        );
    }

    #[test]
    fn edit_medication_coerces_numbers() {
        let kind = FormKind::EditMedication { medication_id: "1".into() };
        let mut draft = kind.seed();
        draft.set("price", "12.5abc");
        draft.set("stock_quantity", "40 units");
        draft.set("minimum_stock_level", "");

        let payload = build_payload(&kind, &draft).unwrap();
        assert_eq!(payload["price"], json!(12.5));
        assert_eq!(payload["stock_quantity"], json!(40));
        assert_eq!(payload["minimum_stock_level"], json!(0));
    }

    fn valid_staff() -> FormDraft {
        let mut draft = FormKind::AddStaff.seed();
        for (k, v) in [
            ("username", "jdoe"),
            ("email", "jdoe@clinic.org"),
            ("first_name", "Jo"),
            ("last_name", "Doe"),
            ("employee_id", "E-100"),
            ("department", "Retina"),
            ("password", "s3cretpass"),
            ("password_confirm", "s3cretpass"),
        ] {
            draft.set(k, v);
        }
        draft
    }

    #[test]
    fn staff_errors_joined_in_order() {
        let mut draft = FormKind::AddStaff.seed();
        draft.set("email", "not-an-email");
        draft.set("password", "short");
        let err = build_payload(&FormKind::AddStaff, &draft).unwrap_err();
        assert_eq!(
            err.user_message(),
            "Username is required, First name is required, Last name is required, \
             Employee ID is required, Department is required, \
             Password confirmation is required, Passwords do not match, \
             Password must be at least 8 characters long, Please enter a valid email address"
        );
    }

    #[test]
    fn staff_payload_coerces_numbers() {
        let mut draft = valid_staff();
        draft.set("years_of_experience", "7");
        let payload = build_payload(&FormKind::AddStaff, &draft).unwrap();
        assert_eq!(payload["years_of_experience"], json!(7));
        assert_eq!(payload["consultation_fee"], Value::Null);

        draft.set("consultation_fee", "80.5");
        let payload = build_payload(&FormKind::AddStaff, &draft).unwrap();
        assert_eq!(payload["consultation_fee"], json!(80.5));
    }

    #[test]
    fn diagnosis_nulls_unused_dates() {
        let kind = FormKind::AddDiagnosis { patient_id: "p1".into() };
        let mut draft = kind.seed();
        draft.set("follow_up_date", "2025-01-01");

        let payload = build_payload(&kind, &draft).unwrap();
        assert_eq!(payload["onset_date"], Value::Null);
        assert_eq!(payload["follow_up_date"], Value::Null);

        draft.set("follow_up_required", true);
        draft.set("onset_date", "2024-12-01");
        let payload = build_payload(&kind, &draft).unwrap();
        assert_eq!(payload["onset_date"], "2024-12-01");
        assert_eq!(payload["follow_up_date"], "2025-01-01");
    }

    #[test]
    fn treatment_optional_numbers() {
        let kind = FormKind::AddTreatment { patient_id: "p1".into() };
        let mut draft = kind.seed();
        let payload = build_payload(&kind, &draft).unwrap();
        assert_eq!(payload["cost_estimate"], Value::Null);
        assert_eq!(payload["duration_days"], Value::Null);
        assert_eq!(payload["end_date"], Value::Null);

        draft.set("duration_days", "14");
        draft.set("cost_estimate", "120.00");
        let payload = build_payload(&kind, &draft).unwrap();
        assert_eq!(payload["duration_days"], json!(14));
        assert_eq!(payload["cost_estimate"], json!(120.0));
    }

    #[test]
    fn payload_keys_match_draft_keys() {
        let mut draft = FormKind::AddPatient.seed();
        draft.set("first_name", "Ada");
        let payload = build_payload(&FormKind::AddPatient, &draft).unwrap();

        let mut payload_keys: Vec<_> = payload.as_object().unwrap().keys().cloned().collect();
        let mut draft_keys: Vec<_> = draft.keys().map(str::to_string).collect();
        payload_keys.sort();
        draft_keys.sort();
        assert_eq!(payload_keys, draft_keys);
        assert_eq!(payload["country"], "UK");
    }

    #[test]
    fn leading_number_parsing() {
        assert_eq!(parse_leading_int(Some(&json!("  42abc"))), Some(42));
        assert_eq!(parse_leading_int(Some(&json!("abc"))), None);
        assert_eq!(parse_leading_int(Some(&json!(3.9))), Some(3));
        assert_eq!(parse_leading_float(Some(&json!(".5"))), Some(0.5));
        assert_eq!(parse_leading_float(Some(&json!("-1.25e2x"))), Some(-125.0));
        assert_eq!(parse_leading_float(None), None);
    }
}
