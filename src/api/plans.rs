//! Test Plans API client.

use serde::{Deserialize, Serialize};

use super::{to_body, Endpoint, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlanCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cases: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cases: Option<Vec<u64>>,
}

/// Test Plans API client.
#[derive(Clone)]
pub struct PlansClient {
    endpoint: Endpoint,
}

impl PlansClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub async fn get_plans(
        &self,
        code: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<RawResponse, ApiError> {
        let query = QueryParams::new()
            .opt("limit", limit)
            .opt("offset", offset);
        self.endpoint
            .call(ApiRequest::get(format!("/plan/{}", code)).with_query(query))
            .await
    }

    pub async fn get_plan(&self, code: &str, id: u64) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/plan/{}/{}", code, id)))
            .await
    }

    pub async fn create_plan(
        &self,
        code: &str,
        request: &PlanCreate,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(format!("/plan/{}", code), to_body(request)?))
            .await
    }

    pub async fn update_plan(
        &self,
        code: &str,
        id: u64,
        request: &PlanUpdate,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/plan/{}/{}", code, id),
                to_body(request)?,
            ))
            .await
    }
}

impl std::fmt::Debug for PlansClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlansClient").finish()
    }
}
