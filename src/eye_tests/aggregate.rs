use std::cmp::Ordering;

use futures_util::future::join_all;

use super::fetch::EyeTestSource;
use super::types::{EyeTestListing, EyeTestRecord, TestCategory, TestSummary};
use crate::error::ApiError;

/// Fetch all 8 category lists concurrently and merge them into one list,
/// newest first. A failing category contributes nothing; only when every
/// category fails is the whole call an error.
pub async fn fetch_all_eye_tests<S: EyeTestSource>(source: &S) -> Result<EyeTestListing, ApiError> {
    collect(source, None).await
}

/// Same pipeline as [`fetch_all_eye_tests`], restricted to one patient.
pub async fn fetch_patient_eye_tests<S: EyeTestSource>(
    source: &S,
    patient_id: &str,
) -> Result<EyeTestListing, ApiError> {
    collect(source, Some(patient_id)).await
}

async fn collect<S: EyeTestSource>(
    source: &S,
    patient_id: Option<&str>,
) -> Result<EyeTestListing, ApiError> {
    let results = join_all(
        TestCategory::ALL
            .iter()
            .map(|&category| async move { (category, source.list_category(category).await) }),
    )
    .await;

    let mut tests = Vec::new();
    let mut failed_categories = Vec::new();

    for (category, result) in results {
        match result {
            Ok(records) => {
                tracing::debug!(category = %category, count = records.len(), "Fetched eye tests");
                tests.extend(
                    records
                        .into_iter()
                        .map(|raw| TestSummary::from_record(&EyeTestRecord::from_raw(category, raw)))
                        .filter(|summary| match patient_id {
                            Some(id) => summary.patient_id.as_deref() == Some(id),
                            None => true,
                        }),
                );
            }
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "Eye test category unavailable");
                failed_categories.push(category);
            }
        }
    }

    if failed_categories.len() == TestCategory::ALL.len() {
        tracing::error!("Every eye test category failed");
        return Err(ApiError::AllSourcesFailed);
    }

    sort_newest_first(&mut tests);
    tracing::info!(
        count = tests.len(),
        failed = failed_categories.len(),
        "Eye test list assembled"
    );

    Ok(EyeTestListing {
        tests,
        failed_categories,
    })
}

/// Stable; undated rows keep their relative order after all dated ones.
pub(crate) fn sort_newest_first(tests: &mut [TestSummary]) {
    tests.sort_by(|a, b| match (a.test_date, b.test_date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
