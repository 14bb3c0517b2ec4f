//! Test Runs API client.

use super::{Endpoint, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// Filters for listing runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunsQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub milestone: Option<u64>,
    pub environment: Option<u64>,
    pub from_start_time: Option<i64>,
    pub to_start_time: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub include: Option<String>,
}

impl RunsQuery {
    fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("search", self.search.as_deref())
            .opt("status", self.status.as_deref())
            .opt("milestone", self.milestone)
            .opt("environment", self.environment)
            .opt("from_start_time", self.from_start_time)
            .opt("to_start_time", self.to_start_time)
            .opt("limit", self.limit)
            .opt("offset", self.offset)
            .opt("include", self.include.as_deref())
    }
}

/// Test Runs API client.
#[derive(Clone)]
pub struct RunsClient {
    endpoint: Endpoint,
}

impl RunsClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// List runs in a project.
    pub async fn get_runs(
        &self,
        code: &str,
        query: &RunsQuery,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/run/{}", code)).with_query(query.to_query()))
            .await
    }

    /// Get a single run, optionally expanding related entities (e.g. `cases`).
    pub async fn get_run(
        &self,
        code: &str,
        id: u64,
        include: Option<&str>,
    ) -> Result<RawResponse, ApiError> {
        let query = QueryParams::new().opt("include", include);
        self.endpoint
            .call(ApiRequest::get(format!("/run/{}/{}", code, id)).with_query(query))
            .await
    }
}

impl std::fmt::Debug for RunsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunsClient").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_query_uses_snake_case_names() {
        let query = RunsQuery {
            status: Some("active".into()),
            from_start_time: Some(1_700_000_000),
            include: Some("cases".into()),
            ..Default::default()
        }
        .to_query();

        assert_eq!(
            query.to_query_string(),
            "?status=active&from_start_time=1700000000&include=cases"
        );
    }
}
