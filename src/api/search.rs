//! QQL search API client.

use super::{Endpoint, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// Search API client.
#[derive(Clone)]
pub struct SearchClient {
    endpoint: Endpoint,
}

impl SearchClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Run a Qase Query Language expression across entities.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<RawResponse, ApiError> {
        let params = QueryParams::new()
            .set("query", query)
            .set("limit", limit)
            .set("offset", offset);
        self.endpoint
            .call(ApiRequest::get("/search").with_query(params))
            .await
    }
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient").finish()
    }
}
