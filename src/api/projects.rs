//! Projects API client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{to_body, Endpoint, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// Request to create a project.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectCreate {
    pub code: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

/// Projects API client.
#[derive(Clone)]
pub struct ProjectsClient {
    endpoint: Endpoint,
}

impl ProjectsClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// List all projects.
    pub async fn list_projects(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<RawResponse, ApiError> {
        let query = QueryParams::new()
            .opt("limit", limit)
            .opt("offset", offset);
        self.endpoint
            .call(ApiRequest::get("/project").with_query(query))
            .await
    }

    /// Get a single project by code.
    pub async fn get_project(&self, code: &str) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/project/{}", code)))
            .await
    }

    /// Create a new project. The result carries the new project's code.
    pub async fn create_project(
        &self,
        request: &ProjectCreate,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post("/project", to_body(request)?))
            .await
    }
}

impl std::fmt::Debug for ProjectsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectsClient").finish()
    }
}
