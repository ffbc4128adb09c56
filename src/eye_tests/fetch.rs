use std::future::Future;

use serde_json::Value;

use super::types::TestCategory;
use crate::api::ApiClient;
use crate::error::ApiError;

/// Where category lists come from. [`ApiClient`] in production; tests
/// substitute an in-memory source.
pub trait EyeTestSource: Sync {
    fn list_category(
        &self,
        category: TestCategory,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>> + Send;
}

impl EyeTestSource for ApiClient {
    async fn list_category(&self, category: TestCategory) -> Result<Vec<Value>, ApiError> {
        self.list(category.resource().path(), &[]).await
    }
}
