//! Mapping raw backend JSON into typed records and list summaries.
//!
//! Every display field falls back independently: nested `*_details`
//! object, then flat name field, then an id placeholder.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{
    CommonFields, EyeTestRecord, PartyDetails, TestCategory, TestDetails, TestSummary,
};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

impl EyeTestRecord {
    /// Build a record from one element of a category list. The category
    /// decides the payload variant; a payload that does not read as that
    /// category keeps its raw JSON under [`TestDetails::Generic`].
    pub fn from_raw(category: TestCategory, raw: Value) -> Self {
        let common: CommonFields = serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
            tracing::warn!(category = %category, error = %e, "Record is not a JSON object");
            CommonFields::default()
        });

        let details = match category {
            TestCategory::VisualAcuity => typed(&raw, category).map(TestDetails::VisualAcuity),
            TestCategory::Refraction => typed(&raw, category).map(TestDetails::Refraction),
            TestCategory::Cataract => typed(&raw, category).map(TestDetails::Cataract),
            TestCategory::Glaucoma => typed(&raw, category).map(TestDetails::Glaucoma),
            TestCategory::VisualField => typed(&raw, category).map(TestDetails::VisualField),
            TestCategory::Retinal => typed(&raw, category).map(TestDetails::Retinal),
            TestCategory::DiabeticRetinopathy => {
                typed(&raw, category).map(TestDetails::DiabeticRetinopathy)
            }
            TestCategory::Oct => typed(&raw, category).map(TestDetails::Oct),
        }
        .unwrap_or(TestDetails::Generic);

        Self {
            category,
            common,
            details,
            raw,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.common.id.as_deref()
    }

    pub fn patient_label(&self) -> String {
        patient_label(&self.common)
    }

    pub fn doctor_label(&self) -> String {
        doctor_label(&self.common)
    }

    /// `test_date`, else `date_performed`, parsed to UTC.
    pub fn test_date(&self) -> Option<DateTime<Utc>> {
        self.common
            .test_date
            .as_deref()
            .or(self.common.date_performed.as_deref())
            .and_then(parse_test_date)
    }
}

fn typed<T: DeserializeOwned>(raw: &Value, category: TestCategory) -> Option<T> {
    match serde_json::from_value(raw.clone()) {
        Ok(details) => Some(details),
        Err(e) => {
            tracing::warn!(category = %category, error = %e, "Falling back to generic record");
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Labels
// ═══════════════════════════════════════════════════════════

/// `name`, else first + last (whichever are present).
fn details_name(details: Option<&PartyDetails>) -> Option<String> {
    let details = details?;
    if let Some(name) = &details.name {
        return Some(name.clone());
    }
    let parts: Vec<&str> = [details.first_name.as_deref(), details.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

pub fn patient_label(common: &CommonFields) -> String {
    details_name(common.patient_details.as_ref())
        .or_else(|| common.patient_name.clone())
        .unwrap_or_else(|| match &common.patient {
            Some(id) => format!("Patient ID: {id}"),
            None => "Unknown Patient".to_string(),
        })
}

pub fn doctor_label(common: &CommonFields) -> String {
    details_name(common.performed_by_details.as_ref())
        .or_else(|| common.performed_by_name.clone())
        .or_else(|| common.doctor_name.clone())
        .unwrap_or_else(|| match common.performed_by.as_ref().or(common.doctor.as_ref()) {
            Some(id) => format!("Doctor ID: {id}"),
            None => "Unknown Doctor".to_string(),
        })
}

// ═══════════════════════════════════════════════════════════
// Dates
// ═══════════════════════════════════════════════════════════

/// Accepts RFC 3339, naive date-times (taken as UTC) and plain dates
/// (midnight UTC). Anything else is `None`.
pub fn parse_test_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ═══════════════════════════════════════════════════════════
// Per-eye headline
// ═══════════════════════════════════════════════════════════

fn join_parts(parts: &[(&str, Option<&String>)]) -> Option<String> {
    let rendered: Vec<String> = parts
        .iter()
        .filter_map(|(label, value)| value.map(|v| format!("{label} {v}")))
        .collect();
    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join(", "))
    }
}

/// Short right/left result text for a list row.
fn eye_results(details: &TestDetails) -> (Option<String>, Option<String>) {
    match details {
        TestDetails::VisualAcuity(d) => (
            d.right_eye_aided
                .clone()
                .or_else(|| d.right_eye_unaided.clone()),
            d.left_eye_aided.clone().or_else(|| d.left_eye_unaided.clone()),
        ),
        TestDetails::Refraction(d) => (
            join_parts(&[
                ("SPH", d.right_eye_sphere.as_ref()),
                ("CYL", d.right_eye_cylinder.as_ref()),
                ("AXIS", d.right_eye_axis.as_ref()),
            ]),
            join_parts(&[
                ("SPH", d.left_eye_sphere.as_ref()),
                ("CYL", d.left_eye_cylinder.as_ref()),
                ("AXIS", d.left_eye_axis.as_ref()),
            ]),
        ),
        TestDetails::Cataract(d) => (
            d.right_eye_severity
                .clone()
                .or_else(|| d.right_eye_nuclear_sclerosis.clone()),
            d.left_eye_severity
                .clone()
                .or_else(|| d.left_eye_nuclear_sclerosis.clone()),
        ),
        TestDetails::Glaucoma(d) => (
            d.right_eye_iop.as_ref().map(|v| format!("IOP {v} mmHg")),
            d.left_eye_iop.as_ref().map(|v| format!("IOP {v} mmHg")),
        ),
        TestDetails::VisualField(d) => (
            d.right_eye_md.as_ref().map(|v| format!("MD {v} dB")),
            d.left_eye_md.as_ref().map(|v| format!("MD {v} dB")),
        ),
        TestDetails::Retinal(d) => (
            d.right_retina_findings.clone(),
            d.left_retina_findings.clone(),
        ),
        TestDetails::DiabeticRetinopathy(d) => (
            d.right_eye_retinopathy_grade_display
                .clone()
                .or_else(|| d.right_eye_retinopathy_grade.clone()),
            d.left_eye_retinopathy_grade_display
                .clone()
                .or_else(|| d.left_eye_retinopathy_grade.clone()),
        ),
        TestDetails::Oct(d) => (
            d.right_eye_crt.as_ref().map(|v| format!("CRT {v} μm")),
            d.left_eye_crt.as_ref().map(|v| format!("CRT {v} μm")),
        ),
        TestDetails::Generic => (None, None),
    }
}

impl TestSummary {
    pub fn from_record(record: &EyeTestRecord) -> Self {
        let (right_eye_result, left_eye_result) = eye_results(&record.details);
        Self {
            category: record.category,
            original_id: record.id().unwrap_or_default().to_string(),
            patient_id: record.common.patient.clone(),
            patient_label: record.patient_label(),
            test_date: record.test_date(),
            doctor_label: record.doctor_label(),
            right_eye_result,
            left_eye_result,
            notes: record
                .common
                .notes
                .clone()
                .or_else(|| record.common.findings.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn common(value: Value) -> CommonFields {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn patient_label_prefers_nested_name() {
        let c = common(json!({
            "patient": "p1",
            "patient_name": "Flat Name",
            "patient_details": {"name": "Nested Name"}
        }));
        assert_eq!(patient_label(&c), "Nested Name");
    }

    #[test]
    fn patient_label_joins_first_last() {
        let c = common(json!({"patient_details": {"first_name": "Amara", "last_name": "Okafor"}}));
        assert_eq!(patient_label(&c), "Amara Okafor");
    }

    #[test]
    fn patient_label_with_only_first_name() {
        let c = common(json!({"patient_details": {"first_name": "Amara"}}));
        assert_eq!(patient_label(&c), "Amara");
    }

    #[test]
    fn patient_label_falls_to_flat_then_id() {
        let flat = common(json!({"patient": "p1", "patient_name": "Flat Name", "patient_details": {}}));
        assert_eq!(patient_label(&flat), "Flat Name");

        let bare = common(json!({"patient": "p1"}));
        assert_eq!(patient_label(&bare), "Patient ID: p1");
    }

    #[test]
    fn doctor_label_tiers_are_independent_of_patient() {
        let c = common(json!({
            "patient_details": {"name": "Nested Patient"},
            "performed_by": 12
        }));
        assert_eq!(patient_label(&c), "Nested Patient");
        assert_eq!(doctor_label(&c), "Doctor ID: 12");
    }

    #[test]
    fn doctor_label_reads_flat_name() {
        let c = common(json!({"performed_by": 12, "performed_by_name": "Dr. Lin"}));
        assert_eq!(doctor_label(&c), "Dr. Lin");
    }

    #[test]
    fn parses_supported_date_shapes() {
        let rfc = parse_test_date("2024-03-05T10:30:00+02:00").unwrap();
        assert_eq!(rfc.hour(), 8);

        let naive = parse_test_date("2024-03-05T10:30:00.123456").unwrap();
        assert_eq!(naive.minute(), 30);

        let date = parse_test_date("2024-03-05").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 5));

        assert!(parse_test_date("").is_none());
        assert!(parse_test_date("next tuesday").is_none());
    }

    #[test]
    fn record_uses_category_not_field_presence() {
        // Carries a pressure field but came from the OCT endpoint.
        let record = EyeTestRecord::from_raw(
            TestCategory::Oct,
            json!({"id": "x", "right_eye_iop": 21, "right_central_thickness": 250}),
        );
        match &record.details {
            TestDetails::Oct(d) => assert_eq!(d.right_eye_crt.as_deref(), Some("250")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_object_record_is_generic() {
        let record = EyeTestRecord::from_raw(TestCategory::Glaucoma, json!("oops"));
        assert_eq!(record.details, TestDetails::Generic);
        assert!(record.id().is_none());
    }

    #[test]
    fn summary_from_glaucoma_record() {
        let record = EyeTestRecord::from_raw(
            TestCategory::Glaucoma,
            json!({
                "id": "g-1",
                "patient": "p-9",
                "patient_name": "Ruth Mensah",
                "performed_by_details": {"first_name": "Ken", "last_name": "Ito"},
                "assessment_date": "ignored",
                "date_performed": "2024-01-02",
                "right_eye_iop": "18.5",
                "findings": "Open angles"
            }),
        );
        let summary = TestSummary::from_record(&record);
        assert_eq!(summary.original_id, "g-1");
        assert_eq!(summary.patient_label, "Ruth Mensah");
        assert_eq!(summary.doctor_label, "Ken Ito");
        assert_eq!(summary.right_eye_result.as_deref(), Some("IOP 18.5 mmHg"));
        assert!(summary.left_eye_result.is_none());
        assert_eq!(summary.notes.as_deref(), Some("Open angles"));
        assert!(summary.test_date.is_some());
    }

    #[test]
    fn refraction_summary_joins_present_parts() {
        let record = EyeTestRecord::from_raw(
            TestCategory::Refraction,
            json!({"id": 1, "right_sphere": "-2.00", "right_axis": 180}),
        );
        let summary = TestSummary::from_record(&record);
        assert_eq!(summary.right_eye_result.as_deref(), Some("SPH -2.00, AXIS 180"));
        assert!(summary.left_eye_result.is_none());
    }
}
