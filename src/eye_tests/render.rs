//! Display model for the eye-test detail page.
//!
//! Rendering never fails: a missing value shows as [`NOT_AVAILABLE`] and a
//! record the typed templates cannot read falls back to a JSON dump.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::normalize::parse_test_date;
use super::types::{
    CataractDetails, DiabeticRetinopathyDetails, EyeTestRecord, GlaucomaDetails, OctDetails,
    RefractionDetails, ResolvedTest, TestDetails, VisualAcuityDetails, VisualFieldDetails,
};
use super::types::de::value_flag;

pub const NOT_AVAILABLE: &str = "N/A";

/// Which results layout a detail page uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderTemplate {
    VisualAcuity,
    Glaucoma,
    Refraction,
    Cataract,
    VisualField,
    Oct,
    DiabeticRetinopathy,
    Generic,
}

impl RenderTemplate {
    /// Case-insensitive substring match on the category label, first hit
    /// wins. Labels matching none of the known keys get the generic dump.
    pub fn for_label(label: &str) -> Self {
        const ORDER: [(&str, RenderTemplate); 7] = [
            ("visual acuity", RenderTemplate::VisualAcuity),
            ("glaucoma", RenderTemplate::Glaucoma),
            ("refraction", RenderTemplate::Refraction),
            ("cataract", RenderTemplate::Cataract),
            ("visual field", RenderTemplate::VisualField),
            ("oct", RenderTemplate::Oct),
            ("diabetic", RenderTemplate::DiabeticRetinopathy),
        ];
        let label = label.to_lowercase();
        ORDER
            .iter()
            .find(|(key, _)| label.contains(key))
            .map(|(_, template)| *template)
            .unwrap_or(RenderTemplate::Generic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailSection {
    pub title: String,
    pub rows: Vec<DetailRow>,
    /// Free text (findings, JSON dump, badge text).
    pub text: Option<String>,
    /// In-app route this section links to.
    pub link: Option<String>,
}

impl DetailSection {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    fn row(mut self, label: &str, value: Option<String>) -> Self {
        self.rows.push(DetailRow {
            label: label.to_string(),
            value: value.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        });
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn link(mut self, path: String) -> Self {
        self.link = Some(path);
        self
    }
}

/// Everything the detail page shows for one resolved test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub heading: String,
    pub subtitle: String,
    pub template: RenderTemplate,
    pub patient: DetailSection,
    pub test_info: DetailSection,
    pub results: Vec<DetailSection>,
    /// Findings, recommendations, notes, follow-up, consultation link.
    pub clinical: Vec<DetailSection>,
    pub metadata: DetailSection,
}

impl DetailView {
    pub fn from_resolved(resolved: &ResolvedTest) -> Self {
        let label = resolved.category.label();
        let record = &resolved.record;
        let template = RenderTemplate::for_label(label);

        Self {
            heading: label.to_string(),
            subtitle: format!("Test ID: {}", record.id().unwrap_or(NOT_AVAILABLE)),
            template,
            patient: patient_section(record),
            test_info: test_info_section(record),
            results: results_sections(template, record),
            clinical: clinical_sections(record),
            metadata: DetailSection::new("Record Information")
                .row("Created", display_datetime(record.common.created_at.as_deref()))
                .row("Last Updated", display_datetime(record.common.updated_at.as_deref())),
        }
    }

    /// All sections in page order.
    pub fn sections(&self) -> impl Iterator<Item = &DetailSection> {
        std::iter::once(&self.patient)
            .chain(std::iter::once(&self.test_info))
            .chain(self.results.iter())
            .chain(self.clinical.iter())
            .chain(std::iter::once(&self.metadata))
    }
}

// ═══════════════════════════════════════════════════════════
// Shared sections
// ═══════════════════════════════════════════════════════════

fn display_datetime(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    Some(
        parse_test_date(raw)
            .map(|dt: DateTime<Utc>| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| raw.to_string()),
    )
}

fn display_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    Some(
        parse_test_date(raw)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| raw.to_string()),
    )
}

fn patient_section(record: &EyeTestRecord) -> DetailSection {
    let common = &record.common;
    let mut section =
        DetailSection::new("Patient Information").row("Patient", Some(record.patient_label()));

    if let Some(details) = &common.patient_details {
        if details.date_of_birth.is_some() {
            section = section.row("Date of Birth", display_date(details.date_of_birth.as_deref()));
        }
        if details.patient_number.is_some() {
            section = section.row("Patient Number", details.patient_number.clone());
        }
    }
    if let Some(patient) = &common.patient {
        section = section.link(format!("/patients/{patient}"));
    }
    section
}

fn test_info_section(record: &EyeTestRecord) -> DetailSection {
    let common = &record.common;
    let date = common.test_date.as_deref().or(common.date_performed.as_deref());
    let mut section = DetailSection::new("Test Information")
        .row("Test Date", display_datetime(date))
        .row("Performed By", Some(record.doctor_label()));

    if common.eye_side.is_some() {
        section = section.row(
            "Eye Side",
            common.eye_side_display.clone().or_else(|| common.eye_side.clone()),
        );
    }
    if common.status.is_some() {
        section = section.row(
            "Status",
            common.status_display.clone().or_else(|| common.status.clone()),
        );
    }
    section
}

fn clinical_sections(record: &EyeTestRecord) -> Vec<DetailSection> {
    let common = &record.common;
    let mut sections = Vec::new();

    if let Some(findings) = &common.findings {
        sections.push(DetailSection::new("Clinical Findings").text(findings.as_str()));
    }
    if let Some(recommendations) = &common.recommendations {
        sections.push(DetailSection::new("Recommendations").text(recommendations.as_str()));
    }
    if let Some(notes) = &common.notes {
        sections.push(DetailSection::new("Additional Notes").text(notes.as_str()));
    }
    if common.follow_up_required == Some(true) {
        let mut section = DetailSection::new("Follow-up Required");
        if common.follow_up_date.is_some() {
            section = section.row("Follow-up Date", display_date(common.follow_up_date.as_deref()));
        }
        sections.push(section);
    }
    if let Some(consultation) = &common.consultation {
        sections.push(
            DetailSection::new("Related Consultation").link(format!("/consultations/{consultation}")),
        );
    }
    sections
}

// ═══════════════════════════════════════════════════════════
// Result templates
// ═══════════════════════════════════════════════════════════

fn results_sections(template: RenderTemplate, record: &EyeTestRecord) -> Vec<DetailSection> {
    match (template, &record.details) {
        (RenderTemplate::VisualAcuity, TestDetails::VisualAcuity(d)) => visual_acuity(d),
        (RenderTemplate::Glaucoma, TestDetails::Glaucoma(d)) => glaucoma(d),
        (RenderTemplate::Refraction, TestDetails::Refraction(d)) => refraction(d),
        (RenderTemplate::Cataract, TestDetails::Cataract(d)) => cataract(d),
        (RenderTemplate::VisualField, TestDetails::VisualField(d)) => visual_field(d),
        (RenderTemplate::Oct, TestDetails::Oct(d)) => oct(d),
        (RenderTemplate::DiabeticRetinopathy, TestDetails::DiabeticRetinopathy(d)) => {
            diabetic_retinopathy(d)
        }
        _ => vec![generic(&record.raw)],
    }
}

fn with_unit(value: &Option<String>, unit: &str) -> Option<String> {
    value.as_ref().map(|v| format!("{v}{unit}"))
}

fn generic(raw: &Value) -> DetailSection {
    let dump = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
    DetailSection::new("Test Results").text(dump)
}

fn visual_acuity(d: &VisualAcuityDetails) -> Vec<DetailSection> {
    let mut sections = vec![
        DetailSection::new("Test Method").text(
            d.test_method_display
                .clone()
                .or_else(|| d.test_method.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        DetailSection::new("Right Eye Results")
            .row("Unaided", d.right_eye_unaided.clone())
            .row("Aided", d.right_eye_aided.clone())
            .row("Pinhole", d.right_eye_pinhole.clone()),
        DetailSection::new("Left Eye Results")
            .row("Unaided", d.left_eye_unaided.clone())
            .row("Aided", d.left_eye_aided.clone())
            .row("Pinhole", d.left_eye_pinhole.clone()),
    ];
    if let Some(binocular) = &d.binocular_vision {
        sections.push(DetailSection::new("Binocular Vision").text(binocular.as_str()));
    }
    sections
}

fn glaucoma(d: &GlaucomaDetails) -> Vec<DetailSection> {
    let mut sections = vec![
        DetailSection::new("IOP (Intraocular Pressure)")
            .row("Right Eye", with_unit(&d.right_eye_iop, " mmHg"))
            .row("Left Eye", with_unit(&d.left_eye_iop, " mmHg")),
        DetailSection::new("Cup-Disc Ratio")
            .row("Right Eye", d.right_eye_cup_disc_ratio.clone())
            .row("Left Eye", d.left_eye_cup_disc_ratio.clone()),
    ];
    if let Some(gonioscopy) = &d.gonioscopy_results {
        sections.push(DetailSection::new("Gonioscopy Results").text(gonioscopy.as_str()));
    }
    if let Some(pachymetry) = &d.pachymetry_results {
        sections.push(DetailSection::new("Pachymetry Results").text(pachymetry.as_str()));
    }
    sections
}

fn refraction(d: &RefractionDetails) -> Vec<DetailSection> {
    let mut sections = vec![
        DetailSection::new("Right Eye Refraction")
            .row("Sphere", d.right_eye_sphere.clone())
            .row("Cylinder", d.right_eye_cylinder.clone())
            .row("Axis", d.right_eye_axis.clone())
            .row("Add", d.right_eye_add.clone())
            .row("Visual Acuity", d.right_eye_visual_acuity.clone()),
        DetailSection::new("Left Eye Refraction")
            .row("Sphere", d.left_eye_sphere.clone())
            .row("Cylinder", d.left_eye_cylinder.clone())
            .row("Axis", d.left_eye_axis.clone())
            .row("Add", d.left_eye_add.clone())
            .row("Visual Acuity", d.left_eye_visual_acuity.clone()),
    ];
    if d.prescription_issued == Some(true) {
        sections.push(DetailSection::new("Prescription").text("Prescription Issued"));
    }
    sections
}

fn cataract(d: &CataractDetails) -> Vec<DetailSection> {
    let mut sections = vec![
        DetailSection::new("Right Eye Grading")
            .row("Nuclear Sclerosis", d.right_eye_nuclear_sclerosis.clone())
            .row("Cortical", d.right_eye_cortical.clone())
            .row("PSC", d.right_eye_psc.clone()),
        DetailSection::new("Left Eye Grading")
            .row("Nuclear Sclerosis", d.left_eye_nuclear_sclerosis.clone())
            .row("Cortical", d.left_eye_cortical.clone())
            .row("PSC", d.left_eye_psc.clone()),
    ];
    if let Some(surgery) = d.surgery_recommended {
        sections.push(DetailSection::new("Treatment Recommendation").text(if surgery {
            "Surgery Recommended"
        } else {
            "Conservative Management"
        }));
    }
    sections
}

fn visual_field(d: &VisualFieldDetails) -> Vec<DetailSection> {
    vec![
        DetailSection::new("Test Parameters")
            .row(
                "Test Type",
                d.test_type_display.clone().or_else(|| d.test_type.clone()),
            )
            .row(
                "Strategy",
                d.test_strategy_display
                    .clone()
                    .or_else(|| d.test_strategy.clone()),
            ),
        DetailSection::new("Right Eye Results")
            .row("MD (Mean Deviation)", with_unit(&d.right_eye_md, " dB"))
            .row("PSD", with_unit(&d.right_eye_psd, " dB"))
            .row("VFI", with_unit(&d.right_eye_vfi, "%")),
        DetailSection::new("Left Eye Results")
            .row("MD (Mean Deviation)", with_unit(&d.left_eye_md, " dB"))
            .row("PSD", with_unit(&d.left_eye_psd, " dB"))
            .row("VFI", with_unit(&d.left_eye_vfi, "%")),
    ]
}

fn oct(d: &OctDetails) -> Vec<DetailSection> {
    let mut sections = vec![DetailSection::new("Scan Type").text(
        d.scan_type_display
            .clone()
            .or_else(|| d.scan_type.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    )];
    let measurements = [
        ("Right Eye CRT", &d.right_eye_crt),
        ("Left Eye CRT", &d.left_eye_crt),
        ("Right Eye RNFL Thickness", &d.right_eye_rnfl_thickness),
        ("Left Eye RNFL Thickness", &d.left_eye_rnfl_thickness),
    ];
    for (title, value) in measurements {
        if let Some(text) = with_unit(value, " μm") {
            sections.push(DetailSection::new(title).text(text));
        }
    }
    sections
}

/// Older records send a boolean, newer ones a grade code where `none`
/// means no maculopathy.
fn maculopathy_text(raw: &str) -> &'static str {
    let present = value_flag(&Value::String(raw.to_string())).unwrap_or_else(|| {
        !matches!(raw.to_ascii_lowercase().as_str(), "none" | "absent" | "m0")
    });
    if present {
        "Present"
    } else {
        "Absent"
    }
}

fn diabetic_retinopathy(d: &DiabeticRetinopathyDetails) -> Vec<DetailSection> {
    let grade = |display: &Option<String>, code: &Option<String>| {
        display
            .clone()
            .or_else(|| code.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    let mut sections = vec![
        DetailSection::new("Right Eye Grading").text(grade(
            &d.right_eye_retinopathy_grade_display,
            &d.right_eye_retinopathy_grade,
        )),
        DetailSection::new("Left Eye Grading").text(grade(
            &d.left_eye_retinopathy_grade_display,
            &d.left_eye_retinopathy_grade,
        )),
    ];
    if let Some(raw) = &d.right_eye_maculopathy {
        sections.push(DetailSection::new("Right Eye Maculopathy").text(maculopathy_text(raw)));
    }
    if let Some(raw) = &d.left_eye_maculopathy {
        sections.push(DetailSection::new("Left Eye Maculopathy").text(maculopathy_text(raw)));
    }
    if let Some(referral) = d.referral_required {
        sections.push(DetailSection::new("Referral Status").text(if referral {
            "Referral Required"
        } else {
            "No Referral Needed"
        }));
    }
    sections
}
