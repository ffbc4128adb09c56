//! Eye tests across the eight category endpoints.
//!
//! The backend stores each test type in its own collection. This module
//! merges them into one chronological list ([`fetch_all_eye_tests`]),
//! finds a single test by id ([`resolve_test_by_id`]), and turns a found
//! record into a detail page model ([`DetailView`]).

pub mod aggregate;
pub mod fetch;
pub mod normalize;
pub mod render;
pub mod resolve;
pub mod types;

pub use aggregate::{fetch_all_eye_tests, fetch_patient_eye_tests};
pub use fetch::EyeTestSource;
pub use normalize::parse_test_date;
pub use render::{DetailRow, DetailSection, DetailView, RenderTemplate, NOT_AVAILABLE};
pub use resolve::{resolve_test_by_id, resolve_test_in_category, EYE_TEST_NOT_FOUND};
pub use types::{
    CommonFields, EyeSide, EyeTestListing, EyeTestRecord, ListingStatus, PartyDetails,
    ResolvedTest, TestCategory, TestDetails, TestStatus, TestSummary,
};

/// Empty-state text for the merged list.
pub const NO_EYE_TESTS_MESSAGE: &str = "No eye tests found in database";
