//! Catalog of the clinic's create/edit forms.
//!
//! Each kind knows its endpoint, verb, seeded defaults, the message and
//! route shown on success, and how to read a backend rejection.

use reqwest::Method;
use serde_json::{json, Value};

use super::draft::FormDraft;
use crate::api::Resource;

/// Where a rejected submission's message lives in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStyle {
    /// `{"message": "..."}`
    Message,
    /// `{"error": "..."}`
    Error,
    /// `{"field": ["msg", ...], ...}` joined as `field: msgs; field: msgs`.
    FieldMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    AddPatient,
    AddMedication,
    EditMedication { medication_id: String },
    AddDiagnosis { patient_id: String },
    AddTreatment { patient_id: String },
    AddStaff,
    AddAuditLog,
    /// `token` comes from the reset link; `None` when the link had none.
    ResetPassword { token: Option<String> },
}

impl FormKind {
    pub fn method(&self) -> Method {
        match self {
            FormKind::EditMedication { .. } => Method::PUT,
            _ => Method::POST,
        }
    }

    pub fn path(&self) -> String {
        match self {
            FormKind::AddPatient => Resource::Patients.path().to_string(),
            FormKind::AddMedication => Resource::Medications.path().to_string(),
            FormKind::EditMedication { medication_id } => {
                Resource::Medications.item_path(medication_id)
            }
            FormKind::AddDiagnosis { .. } => Resource::Diagnoses.path().to_string(),
            FormKind::AddTreatment { .. } => Resource::Treatments.path().to_string(),
            FormKind::AddStaff => Resource::Staff.path().to_string(),
            FormKind::AddAuditLog => Resource::AuditLogs.path().to_string(),
            FormKind::ResetPassword { .. } => Resource::PasswordResetConfirm.path().to_string(),
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            FormKind::AddPatient => "Patient added successfully!",
            FormKind::AddMedication => "Medication added successfully!",
            FormKind::EditMedication { .. } => "Medication updated successfully!",
            FormKind::AddDiagnosis { .. } => "Diagnosis Added Successfully!",
            FormKind::AddTreatment { .. } => "Treatment Added Successfully!",
            FormKind::AddStaff => "Staff member added successfully!",
            FormKind::AddAuditLog => "Audit log entry created successfully!",
            FormKind::ResetPassword { .. } => "Password reset successfully! Redirecting to login...",
        }
    }

    /// Route to navigate to after a successful submit.
    pub fn redirect(&self) -> String {
        match self {
            FormKind::AddPatient => "/patients".into(),
            FormKind::AddMedication => "/medications".into(),
            FormKind::EditMedication { medication_id } => format!("/medications/{medication_id}"),
            FormKind::AddDiagnosis { patient_id } | FormKind::AddTreatment { patient_id } => {
                format!("/patients/{patient_id}/progress")
            }
            FormKind::AddStaff => "/staff".into(),
            FormKind::AddAuditLog => "/audit-logs".into(),
            FormKind::ResetPassword { .. } => crate::config::LOGIN_PATH.into(),
        }
    }

    pub fn error_style(&self) -> ErrorStyle {
        match self {
            FormKind::AddStaff => ErrorStyle::FieldMap,
            FormKind::ResetPassword { .. } => ErrorStyle::Error,
            _ => ErrorStyle::Message,
        }
    }

    /// Shown when a rejection carries no readable message.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            FormKind::AddPatient => "Failed to add patient",
            FormKind::AddMedication => "Failed to create medication",
            FormKind::EditMedication { .. } => "Failed to update medication. Please try again.",
            FormKind::AddDiagnosis { .. } => "Failed to create diagnosis. Please try again.",
            FormKind::AddTreatment { .. } => "Failed to create treatment. Please try again.",
            FormKind::AddStaff => "Failed to add staff member. Please try again.",
            FormKind::AddAuditLog => "Failed to create audit log entry",
            FormKind::ResetPassword { .. } => {
                "Failed to reset password. The link may have expired."
            }
        }
    }

    /// Fresh draft with the page's defaults.
    pub fn seed(&self) -> FormDraft {
        match self {
            FormKind::AddPatient => blank_with(
                &[
                    "first_name",
                    "last_name",
                    "middle_name",
                    "date_of_birth",
                    "gender",
                    "phone_number",
                    "alternate_phone",
                    "email",
                    "address_line_1",
                    "address_line_2",
                    "city",
                    "state",
                    "postal_code",
                    "emergency_contact_name",
                    "emergency_contact_relationship",
                    "emergency_contact_phone",
                    "insurance_provider",
                    "insurance_number",
                    "nhs_number",
                    "allergies",
                    "medical_history",
                    "current_medications",
                    "blood_group",
                ],
                [("country", json!("UK"))],
            ),
            FormKind::AddMedication => blank_with(
                &[
                    "name",
                    "generic_name",
                    "brand_names",
                    "medication_type",
                    "therapeutic_class",
                    "strength",
                    "active_ingredients",
                    "description",
                    "indications",
                    "contraindications",
                    "side_effects",
                    "standard_dosage",
                    "maximum_daily_dose",
                    "storage_temperature",
                    "shelf_life_months",
                    "special_handling",
                    "manufacturer",
                    "batch_number",
                    "expiry_date",
                    "unit_price",
                ],
                [
                    ("approval_status", json!(true)),
                    ("current_stock", json!(0)),
                    ("minimum_stock_level", json!(10)),
                ],
            ),
            FormKind::EditMedication { .. } => blank_with(
                &EDIT_MEDICATION_TEXT_FIELDS,
                [
                    ("price", json!("")),
                    ("stock_quantity", json!("")),
                    ("minimum_stock_level", json!("")),
                    ("expiry_date", json!("")),
                    ("approval_status", json!("pending")),
                ],
            ),
            FormKind::AddDiagnosis { patient_id } => blank_with(
                &[
                    "consultation",
                    "diagnosis_code",
                    "diagnosis_name",
                    "diagnosis_description",
                    "onset_date",
                    "differential_diagnoses",
                    "clinical_notes",
                    "icd_10_code",
                    "follow_up_date",
                    "treatment_recommended",
                    "diagnosed_by",
                ],
                [
                    ("patient", json!(patient_id)),
                    ("diagnosis_type", json!("primary")),
                    ("severity", json!("mild")),
                    ("diagnosis_status", json!("active")),
                    ("follow_up_required", json!(false)),
                    ("prognosis", json!("good")),
                ],
            ),
            FormKind::AddTreatment { patient_id } => blank_with(
                &[
                    "consultation",
                    "treatment_name",
                    "treatment_description",
                    "end_date",
                    "duration_days",
                    "prescribed_by",
                    "administered_by",
                    "treatment_goals",
                    "success_criteria",
                    "side_effects",
                    "contraindications",
                    "special_instructions",
                    "follow_up_date",
                    "cost_estimate",
                    "treatment_notes",
                    "emergency_instructions",
                ],
                [
                    ("patient", json!(patient_id)),
                    ("treatment_type", json!("medical")),
                    ("treatment_category", json!("medication")),
                    (
                        "start_date",
                        json!(chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()),
                    ),
                    ("treatment_status", json!("active")),
                    ("priority_level", json!("medium")),
                    ("follow_up_required", json!(false)),
                    ("insurance_covered", json!(false)),
                ],
            ),
            FormKind::AddStaff => blank_with(
                &[
                    "username",
                    "email",
                    "first_name",
                    "last_name",
                    "employee_id",
                    "phone_number",
                    "date_of_birth",
                    "password",
                    "password_confirm",
                    "department",
                    "specialization",
                    "license_number",
                    "qualification",
                    "consultation_fee",
                    "emergency_contact",
                    "address",
                    "hire_date",
                ],
                [
                    ("user_type", json!("doctor")),
                    ("years_of_experience", json!(0)),
                    ("is_consultant", json!(false)),
                    ("can_prescribe", json!(false)),
                    ("can_perform_surgery", json!(false)),
                    ("availability_schedule", json!({})),
                ],
            ),
            FormKind::AddAuditLog => blank_with(
                &[
                    "action",
                    "resource_name",
                    "resource_id",
                    "description",
                    "tags",
                    "changes",
                    "old_values",
                    "new_values",
                    "ip_address",
                    "user_agent",
                    "request_url",
                ],
                [
                    ("severity", json!("low")),
                    ("gdpr_relevant", json!(false)),
                    ("hipaa_relevant", json!(false)),
                    ("request_method", json!("GET")),
                ],
            ),
            FormKind::ResetPassword { .. } => blank_with(&["password", "confirmPassword"], []),
        }
    }

    /// Edit-medication draft pre-filled from the stored record, reading
    /// older field names where the current one is missing.
    pub fn edit_medication_draft(record: &Value) -> FormDraft {
        let field = |keys: &[&str]| -> Value {
            keys.iter()
                .filter_map(|k| record.get(*k))
                .find(|v| is_present(v))
                .cloned()
                .unwrap_or_else(|| json!(""))
        };

        let mut draft = FormDraft::new();
        for key in EDIT_MEDICATION_TEXT_FIELDS {
            draft.set(key, field(&[key]));
        }
        draft.set("dosage_form", field(&["dosage_form", "type"]));
        draft.set("price", field(&["price"]));
        draft.set("stock_quantity", field(&["stock_quantity", "current_stock"]));
        draft.set("minimum_stock_level", field(&["minimum_stock_level"]));

        let expiry = record
            .get("expiry_date")
            .and_then(Value::as_str)
            .and_then(|s| s.split('T').next())
            .unwrap_or("");
        draft.set("expiry_date", expiry);

        let approval = field(&["approval_status"]);
        draft.set(
            "approval_status",
            if approval == json!("") { json!("pending") } else { approval },
        );
        draft
    }
}

const EDIT_MEDICATION_TEXT_FIELDS: [&str; 10] = [
    "name",
    "generic_name",
    "brand_name",
    "strength",
    "dosage_form",
    "manufacturer",
    "batch_number",
    "description",
    "side_effects",
    "contraindications",
];

/// Form-sense truthiness of a stored value.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

fn blank_with<const N: usize>(blank: &[&str], defaults: [(&str, Value); N]) -> FormDraft {
    let mut draft = FormDraft::seeded(blank.iter().map(|k| (*k, json!(""))));
    for (key, value) in defaults {
        draft.set(key, value);
    }
    draft
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_medication_is_put_to_item() {
        let kind = FormKind::EditMedication { medication_id: "m-4".into() };
        assert_eq!(kind.method(), Method::PUT);
        assert_eq!(kind.path(), "/api/medications/m-4/");
        assert_eq!(kind.redirect(), "/medications/m-4");
    }

    #[test]
    fn add_medication_seeds_stock_defaults() {
        let draft = FormKind::AddMedication.seed();
        assert_eq!(draft.get("approval_status"), Some(&json!(true)));
        assert_eq!(draft.get("current_stock"), Some(&json!(0)));
        assert_eq!(draft.get("minimum_stock_level"), Some(&json!(10)));
        assert_eq!(draft.text("unit_price"), "");
    }

    #[test]
    fn diagnosis_seed_carries_patient_and_defaults() {
        let draft = FormKind::AddDiagnosis { patient_id: "p-3".into() }.seed();
        assert_eq!(draft.text("patient"), "p-3");
        assert_eq!(draft.text("diagnosis_type"), "primary");
        assert_eq!(draft.text("severity"), "mild");
        assert_eq!(draft.text("prognosis"), "good");
        assert!(!draft.flag("follow_up_required"));
    }

    #[test]
    fn treatment_seed_starts_today() {
        let draft = FormKind::AddTreatment { patient_id: "p".into() }.seed();
        let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(draft.text("start_date"), today);
        assert_eq!(draft.text("treatment_status"), "active");
    }

    #[test]
    fn staff_seed_defaults() {
        let draft = FormKind::AddStaff.seed();
        assert_eq!(draft.text("user_type"), "doctor");
        assert_eq!(draft.get("years_of_experience"), Some(&json!(0)));
        assert_eq!(draft.get("availability_schedule"), Some(&json!({})));
    }

    #[test]
    fn error_styles_per_kind() {
        assert_eq!(FormKind::AddStaff.error_style(), ErrorStyle::FieldMap);
        assert_eq!(
            FormKind::ResetPassword { token: None }.error_style(),
            ErrorStyle::Error
        );
        assert_eq!(FormKind::AddAuditLog.error_style(), ErrorStyle::Message);
    }

    #[test]
    fn edit_draft_reads_record_with_fallbacks() {
        let record = json!({
            "name": "Timolol",
            "type": "eye_drop",
            "price": "4.20",
            "current_stock": 30,
            "expiry_date": "2026-01-31T00:00:00Z",
            "approval_status": null
        });
        let draft = FormKind::edit_medication_draft(&record);

        assert_eq!(draft.text("name"), "Timolol");
        assert_eq!(draft.text("dosage_form"), "eye_drop");
        assert_eq!(draft.get("stock_quantity"), Some(&json!(30)));
        assert_eq!(draft.text("expiry_date"), "2026-01-31");
        assert_eq!(draft.text("approval_status"), "pending");
        assert_eq!(draft.text("brand_name"), "");
    }
}
