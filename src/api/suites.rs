//! Test Suites API client.

use serde::{Deserialize, Serialize};

use super::{to_body, Endpoint, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// Fields for creating or updating a suite.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SuiteData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

/// Test Suites API client.
#[derive(Clone)]
pub struct SuitesClient {
    endpoint: Endpoint,
}

impl SuitesClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub async fn get_suites(
        &self,
        code: &str,
        search: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<RawResponse, ApiError> {
        let query = QueryParams::new()
            .opt("search", search)
            .opt("limit", limit)
            .opt("offset", offset);
        self.endpoint
            .call(ApiRequest::get(format!("/suite/{}", code)).with_query(query))
            .await
    }

    pub async fn get_suite(&self, code: &str, id: u64) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/suite/{}/{}", code, id)))
            .await
    }

    pub async fn create_suite(
        &self,
        code: &str,
        request: &SuiteData,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(format!("/suite/{}", code), to_body(request)?))
            .await
    }

    pub async fn update_suite(
        &self,
        code: &str,
        id: u64,
        request: &SuiteData,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/suite/{}/{}", code, id),
                to_body(request)?,
            ))
            .await
    }
}

impl std::fmt::Debug for SuitesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuitesClient").finish()
    }
}
