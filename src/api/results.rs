//! Test Results API client.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{Endpoint, Extra, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// Step status code Qase uses for a failed step.
pub const STEP_STATUS_FAILED: i64 = 2;

/// Test result entity.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TestResult {
    pub hash: Option<String>,
    pub run_id: Option<u64>,
    pub case_id: Option<u64>,
    pub status: Option<String>,
    pub comment: Option<String>,
    pub stacktrace: Option<String>,
    pub time_spent_ms: Option<u64>,
    pub end_time: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
    pub steps: Option<Vec<StepResult>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl TestResult {
    pub fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }

    /// Steps that ended in failure.
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps
            .iter()
            .flatten()
            .filter(|step| step.status == Some(STEP_STATUS_FAILED))
    }

    /// Stack trace text, treating an empty string as no trace.
    pub fn trace(&self) -> Option<&str> {
        self.stacktrace.as_deref().filter(|s| !s.is_empty())
    }
}

/// Outcome of one step within a result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepResult {
    pub position: Option<i64>,
    pub status: Option<i64>,
    pub attachments: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// File attached to a result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Attachment {
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub mime: Option<String>,
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Filters for listing results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsQuery {
    pub status: Option<String>,
    /// Run ID, or a comma-separated list of run IDs.
    pub run: Option<String>,
    pub from_end_time: Option<String>,
    pub to_end_time: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ResultsQuery {
    fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("status", self.status.as_deref())
            .opt("run", self.run.as_deref())
            .opt("from_end_time", self.from_end_time.as_deref())
            .opt("to_end_time", self.to_end_time.as_deref())
            .opt("limit", self.limit)
            .opt("offset", self.offset)
    }
}

/// Test Results API client.
#[derive(Clone)]
pub struct ResultsClient {
    endpoint: Endpoint,
}

impl ResultsClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// List results in a project, decoded as `R`: typically
    /// `QaseResponse<EntityList<TestResult>>` or [`RawResponse`].
    pub async fn get_results<R: DeserializeOwned>(
        &self,
        code: &str,
        query: &ResultsQuery,
    ) -> Result<R, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/result/{}", code)).with_query(query.to_query()))
            .await
    }

    /// Get a single result by hash.
    pub async fn get_result(
        &self,
        code: &str,
        hash: &str,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/result/{}/{}", code, hash)))
            .await
    }

    /// Record a result in a run.
    pub async fn create_result(
        &self,
        code: &str,
        run_id: u64,
        result: &Map<String, Value>,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(
                format!("/result/{}/{}", code, run_id),
                Value::Object(result.clone()),
            ))
            .await
    }

    /// Record several results in a run.
    pub async fn create_result_bulk(
        &self,
        code: &str,
        run_id: u64,
        results: &[Map<String, Value>],
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(
                format!("/result/{}/{}/bulk", code, run_id),
                json!({ "results": results }),
            ))
            .await
    }

    /// Update an existing result.
    pub async fn update_result(
        &self,
        code: &str,
        run_id: u64,
        hash: &str,
        update: &Map<String, Value>,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/result/{}/{}/{}", code, run_id, hash),
                Value::Object(update.clone()),
            ))
            .await
    }
}

impl std::fmt::Debug for ResultsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultsClient").finish()
    }
}
