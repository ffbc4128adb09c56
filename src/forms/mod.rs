//! Create/edit forms: drafts, per-form validation, submission.

pub mod draft;
pub mod kinds;
pub mod submit;
pub mod validation;

pub use draft::FormDraft;
pub use kinds::{ErrorStyle, FormKind};
pub use submit::{submit_form, SubmitOutcome};
pub use validation::build_payload;
