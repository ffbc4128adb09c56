use serde_json::Value;

use super::fetch::EyeTestSource;
use super::types::{EyeTestRecord, ResolvedTest, TestCategory};
use crate::api::record_id;
use crate::error::ApiError;

pub const EYE_TEST_NOT_FOUND: &str = "Eye test not found";

/// Find a test by id alone, probing categories one at a time in the fixed
/// order and stopping at the first hit. Ids shared across categories
/// resolve to the earliest category; use [`resolve_test_in_category`]
/// when the category is known.
pub async fn resolve_test_by_id<S: EyeTestSource>(
    source: &S,
    id: &str,
) -> Result<ResolvedTest, ApiError> {
    for category in TestCategory::ALL {
        match source.list_category(category).await {
            Ok(records) => {
                if let Some(raw) = find_by_id(records, id) {
                    tracing::debug!(category = %category, id, "Eye test resolved");
                    return Ok(resolved(category, raw));
                }
            }
            Err(e) => {
                tracing::warn!(category = %category, id, error = %e, "Skipping category during lookup");
            }
        }
    }

    tracing::info!(id, "Eye test not found in any category");
    Err(ApiError::NotFound(EYE_TEST_NOT_FOUND.to_string()))
}

/// Look an id up in one category only.
pub async fn resolve_test_in_category<S: EyeTestSource>(
    source: &S,
    category: TestCategory,
    id: &str,
) -> Result<ResolvedTest, ApiError> {
    let records = source.list_category(category).await?;
    find_by_id(records, id)
        .map(|raw| resolved(category, raw))
        .ok_or_else(|| ApiError::NotFound(EYE_TEST_NOT_FOUND.to_string()))
}

fn find_by_id(records: Vec<Value>, id: &str) -> Option<Value> {
    records
        .into_iter()
        .find(|record| record_id(record).as_deref() == Some(id))
}

fn resolved(category: TestCategory, raw: Value) -> ResolvedTest {
    ResolvedTest {
        category,
        record: EyeTestRecord::from_raw(category, raw),
    }
}
