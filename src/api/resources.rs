/// Backend collections the client talks to.
///
/// Paths keep the backend's trailing slash; item paths append `{id}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Patients,
    Consultations,
    Medications,
    Prescriptions,
    Diagnoses,
    Treatments,
    AuditLogs,
    Staff,
    PasswordResetRequest,
    PasswordResetConfirm,
    TokenAuth,
    TwoFactorVerifyLogin,
    VisualAcuityTests,
    RefractionTests,
    CataractAssessments,
    GlaucomaAssessments,
    VisualFieldTests,
    RetinalAssessments,
    DiabeticRetinopathyScreenings,
    OctScans,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Patients => "/api/patients/",
            Resource::Consultations => "/api/consultations/",
            Resource::Medications => "/api/medications/",
            Resource::Prescriptions => "/api/prescriptions/",
            Resource::Diagnoses => "/api/diagnoses/",
            Resource::Treatments => "/api/treatments/",
            Resource::AuditLogs => "/api/audit-logs/",
            Resource::Staff => "/staff/",
            Resource::PasswordResetRequest => "/password-reset/",
            Resource::PasswordResetConfirm => "/password-reset/confirm/",
            Resource::TokenAuth => "/api-token-auth/",
            Resource::TwoFactorVerifyLogin => "/2fa/verify-login/",
            Resource::VisualAcuityTests => "/api/visual-acuity-tests/",
            Resource::RefractionTests => "/api/refraction-tests/",
            Resource::CataractAssessments => "/api/cataract-assessments/",
            Resource::GlaucomaAssessments => "/api/glaucoma-assessments/",
            Resource::VisualFieldTests => "/api/visual-field-tests/",
            Resource::RetinalAssessments => "/api/retinal-assessments/",
            Resource::DiabeticRetinopathyScreenings => "/api/diabetic-retinopathy-screenings/",
            Resource::OctScans => "/api/oct-scans/",
        }
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}{}/", self.path(), id)
    }
}
