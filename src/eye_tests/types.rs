use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::Resource;
use crate::error::ApiError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ApiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ApiError::Decode(format!(
                        "invalid {} value: {}",
                        stringify!($name),
                        s
                    ))),
                }
            }
        }
    };
}

str_enum!(TestCategory {
    VisualAcuity => "visual_acuity",
    Refraction => "refraction",
    Cataract => "cataract",
    Glaucoma => "glaucoma",
    VisualField => "visual_field",
    Retinal => "retinal",
    DiabeticRetinopathy => "diabetic_retinopathy",
    Oct => "oct",
});

str_enum!(EyeSide {
    Both => "both",
    Left => "left",
    Right => "right",
});

str_enum!(TestStatus {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
    Incomplete => "incomplete",
});

impl TestCategory {
    /// Fixed probe order shared by the aggregator and the resolver.
    pub const ALL: [TestCategory; 8] = [
        TestCategory::VisualAcuity,
        TestCategory::Refraction,
        TestCategory::Cataract,
        TestCategory::Glaucoma,
        TestCategory::VisualField,
        TestCategory::Retinal,
        TestCategory::DiabeticRetinopathy,
        TestCategory::Oct,
    ];

    pub fn resource(&self) -> Resource {
        match self {
            TestCategory::VisualAcuity => Resource::VisualAcuityTests,
            TestCategory::Refraction => Resource::RefractionTests,
            TestCategory::Cataract => Resource::CataractAssessments,
            TestCategory::Glaucoma => Resource::GlaucomaAssessments,
            TestCategory::VisualField => Resource::VisualFieldTests,
            TestCategory::Retinal => Resource::RetinalAssessments,
            TestCategory::DiabeticRetinopathy => Resource::DiabeticRetinopathyScreenings,
            TestCategory::Oct => Resource::OctScans,
        }
    }

    /// Heading shown on list rows and the detail page.
    pub fn label(&self) -> &'static str {
        match self {
            TestCategory::VisualAcuity => "Visual Acuity Test",
            TestCategory::Refraction => "Refraction Test",
            TestCategory::Cataract => "Cataract Assessment",
            TestCategory::Glaucoma => "Glaucoma Assessment",
            TestCategory::VisualField => "Visual Field Test",
            TestCategory::Retinal => "Retinal Assessment",
            TestCategory::DiabeticRetinopathy => "Diabetic Retinopathy Screening",
            TestCategory::Oct => "OCT Scan",
        }
    }
}

impl std::fmt::Display for TestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ═══════════════════════════════════════════════════════════
// Aggregator output
// ═══════════════════════════════════════════════════════════

/// One row of the unified eye-test list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSummary {
    pub category: TestCategory,
    pub original_id: String,
    pub patient_id: Option<String>,
    pub patient_label: String,
    /// `None` when the backend sent no date or one that does not parse.
    pub test_date: Option<DateTime<Utc>>,
    pub doctor_label: String,
    pub right_eye_result: Option<String>,
    pub left_eye_result: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListingStatus {
    Loaded,
    NoData,
}

/// Merged, sorted output of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct EyeTestListing {
    pub tests: Vec<TestSummary>,
    /// Categories whose fetch failed and contributed nothing.
    pub failed_categories: Vec<TestCategory>,
}

impl EyeTestListing {
    pub fn status(&self) -> ListingStatus {
        if self.tests.is_empty() {
            ListingStatus::NoData
        } else {
            ListingStatus::Loaded
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Empty-state text when there is nothing to show.
    pub fn empty_message(&self) -> Option<&'static str> {
        match self.status() {
            ListingStatus::NoData => Some(super::NO_EYE_TESTS_MESSAGE),
            ListingStatus::Loaded => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Resolver output: typed record
// ═══════════════════════════════════════════════════════════

/// Nested patient / clinician object some serializers attach.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PartyDetails {
    #[serde(default, deserialize_with = "de::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub patient_number: Option<String>,
}

/// Fields every eye-test serializer shares.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CommonFields {
    #[serde(default, deserialize_with = "de::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub patient: Option<String>,
    #[serde(default, deserialize_with = "de::details")]
    pub patient_details: Option<PartyDetails>,
    #[serde(default, deserialize_with = "de::text")]
    pub patient_name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub performed_by: Option<String>,
    #[serde(default, deserialize_with = "de::details")]
    pub performed_by_details: Option<PartyDetails>,
    #[serde(default, deserialize_with = "de::text")]
    pub performed_by_name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub doctor: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub doctor_name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub consultation: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub test_date: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub date_performed: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub eye_side: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub eye_side_display: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub status_display: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub findings: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub recommendations: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub follow_up_required: Option<bool>,
    #[serde(default, deserialize_with = "de::text")]
    pub follow_up_date: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub updated_at: Option<String>,
}

impl CommonFields {
    pub fn eye_side(&self) -> Option<EyeSide> {
        self.eye_side.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn status(&self) -> Option<TestStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VisualAcuityDetails {
    #[serde(default, deserialize_with = "de::text")]
    pub test_method: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub test_method_display: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_unaided: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_aided: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_pinhole: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_unaided: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_aided: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_pinhole: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub binocular_vision: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RefractionDetails {
    #[serde(default, alias = "right_sphere", deserialize_with = "de::text")]
    pub right_eye_sphere: Option<String>,
    #[serde(default, alias = "right_cylinder", deserialize_with = "de::text")]
    pub right_eye_cylinder: Option<String>,
    #[serde(default, alias = "right_axis", deserialize_with = "de::text")]
    pub right_eye_axis: Option<String>,
    #[serde(default, alias = "right_add", deserialize_with = "de::text")]
    pub right_eye_add: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_visual_acuity: Option<String>,
    #[serde(default, alias = "left_sphere", deserialize_with = "de::text")]
    pub left_eye_sphere: Option<String>,
    #[serde(default, alias = "left_cylinder", deserialize_with = "de::text")]
    pub left_eye_cylinder: Option<String>,
    #[serde(default, alias = "left_axis", deserialize_with = "de::text")]
    pub left_eye_axis: Option<String>,
    #[serde(default, alias = "left_add", deserialize_with = "de::text")]
    pub left_eye_add: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_visual_acuity: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub prescription_issued: Option<bool>,
    #[serde(default, deserialize_with = "de::text")]
    pub pupillary_distance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CataractDetails {
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_nuclear_sclerosis: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_cortical: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_psc: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_cataract_type: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_severity: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_nuclear_sclerosis: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_cortical: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_psc: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_cataract_type: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_severity: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub surgery_recommended: Option<bool>,
    #[serde(default, deserialize_with = "de::text")]
    pub urgency_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GlaucomaDetails {
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_iop: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_iop: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub iop_method: Option<String>,
    #[serde(default, alias = "right_disc_cup_ratio", deserialize_with = "de::text")]
    pub right_eye_cup_disc_ratio: Option<String>,
    #[serde(default, alias = "left_disc_cup_ratio", deserialize_with = "de::text")]
    pub left_eye_cup_disc_ratio: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub gonioscopy_results: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub pachymetry_results: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub glaucoma_type: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub target_iop: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VisualFieldDetails {
    #[serde(default, deserialize_with = "de::text")]
    pub test_type: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub test_type_display: Option<String>,
    #[serde(default, alias = "strategy", deserialize_with = "de::text")]
    pub test_strategy: Option<String>,
    #[serde(default, alias = "strategy_display", deserialize_with = "de::text")]
    pub test_strategy_display: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_md: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_psd: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_vfi: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_md: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_psd: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_vfi: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RetinalDetails {
    #[serde(default, deserialize_with = "de::text")]
    pub right_retina_findings: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_retina_findings: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub primary_diagnosis: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DiabeticRetinopathyDetails {
    #[serde(default, alias = "right_eye_dr_grade", deserialize_with = "de::text")]
    pub right_eye_retinopathy_grade: Option<String>,
    #[serde(default, alias = "right_eye_dr_grade_display", deserialize_with = "de::text")]
    pub right_eye_retinopathy_grade_display: Option<String>,
    #[serde(default, alias = "left_eye_dr_grade", deserialize_with = "de::text")]
    pub left_eye_retinopathy_grade: Option<String>,
    #[serde(default, alias = "left_eye_dr_grade_display", deserialize_with = "de::text")]
    pub left_eye_retinopathy_grade_display: Option<String>,
    /// Boolean on older serializers, a grade code on newer ones.
    #[serde(default, deserialize_with = "de::text")]
    pub right_eye_maculopathy: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub left_eye_maculopathy: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub referral_required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OctDetails {
    #[serde(default, deserialize_with = "de::text")]
    pub scan_type: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub scan_type_display: Option<String>,
    #[serde(default, alias = "right_central_thickness", deserialize_with = "de::text")]
    pub right_eye_crt: Option<String>,
    #[serde(default, alias = "left_central_thickness", deserialize_with = "de::text")]
    pub left_eye_crt: Option<String>,
    #[serde(default, alias = "right_average_thickness", deserialize_with = "de::text")]
    pub right_eye_rnfl_thickness: Option<String>,
    #[serde(default, alias = "left_average_thickness", deserialize_with = "de::text")]
    pub left_eye_rnfl_thickness: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub scan_quality: Option<String>,
}

/// Category-specific payload, fixed when the record is mapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum TestDetails {
    VisualAcuity(VisualAcuityDetails),
    Refraction(RefractionDetails),
    Cataract(CataractDetails),
    Glaucoma(GlaucomaDetails),
    VisualField(VisualFieldDetails),
    Retinal(RetinalDetails),
    DiabeticRetinopathy(DiabeticRetinopathyDetails),
    Oct(OctDetails),
    /// Record whose category fields could not be read.
    Generic,
}

/// One eye-test record as returned by its category endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EyeTestRecord {
    pub category: TestCategory,
    pub common: CommonFields,
    pub details: TestDetails,
    /// Untouched backend JSON, used by the generic template.
    pub raw: Value,
}

/// A record located by id, with the category whose endpoint held it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTest {
    pub category: TestCategory,
    pub record: EyeTestRecord,
}

// ═══════════════════════════════════════════════════════════
// Lenient field readers
// ═══════════════════════════════════════════════════════════

/// Serializers disagree on scalar types (Decimal as string, ids as ints,
/// booleans as "true"); these readers accept all of them.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::PartyDetails;

    pub(crate) fn value_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(crate) fn value_flag(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_text(&value))
    }

    pub(crate) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_flag(&value))
    }

    pub(crate) fn details<'de, D>(deserializer: D) -> Result<Option<PartyDetails>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_round_trips_through_str() {
        for category in TestCategory::ALL {
            let parsed: TestCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("strabismus".parse::<TestCategory>().is_err());
    }

    #[test]
    fn probe_order_is_fixed() {
        assert_eq!(TestCategory::ALL[0], TestCategory::VisualAcuity);
        assert_eq!(TestCategory::ALL[7], TestCategory::Oct);
        assert_eq!(TestCategory::ALL.len(), 8);
    }

    #[test]
    fn category_resources_are_distinct() {
        let mut paths: Vec<_> = TestCategory::ALL.iter().map(|c| c.resource().path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 8);
    }

    #[test]
    fn lenient_text_reads_numbers_and_blanks() {
        let common: CommonFields = serde_json::from_value(json!({
            "id": 17,
            "patient": 4,
            "notes": "   ",
            "follow_up_required": "true"
        }))
        .unwrap();
        assert_eq!(common.id.as_deref(), Some("17"));
        assert_eq!(common.patient.as_deref(), Some("4"));
        assert!(common.notes.is_none());
        assert_eq!(common.follow_up_required, Some(true));
    }

    #[test]
    fn non_object_details_ignored() {
        let common: CommonFields = serde_json::from_value(json!({
            "patient_details": "Jane Doe"
        }))
        .unwrap();
        assert!(common.patient_details.is_none());
    }

    #[test]
    fn backend_field_names_accepted_as_aliases() {
        let oct: OctDetails = serde_json::from_value(json!({
            "right_central_thickness": 262,
            "left_average_thickness": 98
        }))
        .unwrap();
        assert_eq!(oct.right_eye_crt.as_deref(), Some("262"));
        assert_eq!(oct.left_eye_rnfl_thickness.as_deref(), Some("98"));

        let refraction: RefractionDetails =
            serde_json::from_value(json!({"right_sphere": "-1.25", "left_axis": 90})).unwrap();
        assert_eq!(refraction.right_eye_sphere.as_deref(), Some("-1.25"));
        assert_eq!(refraction.left_eye_axis.as_deref(), Some("90"));
    }

    #[test]
    fn status_and_side_parse() {
        let common: CommonFields =
            serde_json::from_value(json!({"status": "in_progress", "eye_side": "left"})).unwrap();
        assert_eq!(common.status(), Some(TestStatus::InProgress));
        assert_eq!(common.eye_side(), Some(EyeSide::Left));
    }
}
