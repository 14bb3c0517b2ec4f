//! Shared Steps API client.

use serde::{Deserialize, Serialize};

use super::{to_body, Endpoint, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// One action within a multi-step shared step.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SharedStepItem {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Fields for creating or updating a shared step.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SharedStepData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<SharedStepItem>>,
}

/// Shared Steps API client.
#[derive(Clone)]
pub struct SharedStepsClient {
    endpoint: Endpoint,
}

impl SharedStepsClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub async fn get_shared_steps(
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
            .call(ApiRequest::get(format!("/shared_step/{}", code)).with_query(query))
            .await
    }

    pub async fn get_shared_step(
        &self,
        code: &str,
        hash: &str,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/shared_step/{}/{}", code, hash)))
            .await
    }

    pub async fn create_shared_step(
        &self,
        code: &str,
        request: &SharedStepData,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(
                format!("/shared_step/{}", code),
                to_body(request)?,
            ))
            .await
    }

    pub async fn update_shared_step(
        &self,
        code: &str,
        hash: &str,
        request: &SharedStepData,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/shared_step/{}/{}", code, hash),
                to_body(request)?,
            ))
            .await
    }
}

impl std::fmt::Debug for SharedStepsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStepsClient").finish()
    }
}
