//! Test run tools.

use serde::Deserialize;
use serde_json::Value;

use super::{code_field, limit_field, offset_field, payload};
use crate::api::runs::RunsQuery;
use crate::api::QaseClient;
use crate::envelope::Outcome;
use crate::schema::{Field, ToolSchema};

pub fn get_runs_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::string("search").optional(),
        Field::string("status")
            .optional()
            .describe("Comma-separated: active, complete, abort"),
        Field::integer("milestone").optional(),
        Field::integer("environment").optional(),
        Field::integer("fromStartTime").optional().describe("Unix timestamp"),
        Field::integer("toStartTime").optional().describe("Unix timestamp"),
        limit_field(),
        offset_field(),
        Field::string("include").optional().describe("e.g. cases"),
    ])
}

pub fn get_run_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("id"),
        Field::string("include").optional(),
    ])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRunsParams {
    pub code: String,
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

#[derive(Debug, Deserialize)]
pub struct GetRunParams {
    pub code: String,
    pub id: u64,
    pub include: Option<String>,
}

pub async fn get_runs(client: &QaseClient, params: GetRunsParams) -> Outcome<Value> {
    let query = RunsQuery {
        search: params.search,
        status: params.status,
        milestone: params.milestone,
        environment: params.environment,
        from_start_time: params.from_start_time,
        to_start_time: params.to_start_time,
        limit: params.limit,
        offset: params.offset,
        include: params.include,
    };
    payload(client.runs.get_runs(&params.code, &query).await)
}

pub async fn get_run(client: &QaseClient, params: GetRunParams) -> Outcome<Value> {
    payload(
        client
            .runs
            .get_run(&params.code, params.id, params.include.as_deref())
            .await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_run_passes_include() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/run/DEMO/3",
            json!({"status": true, "result": {"id": 3, "title": "Nightly", "cases": [1, 2]}}),
        );

        let outcome = get_run(
            &client(&transport),
            GetRunParams {
                code: "DEMO".into(),
                id: 3,
                include: Some("cases".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome["result"]["cases"], json!([1, 2]));
        assert_eq!(transport.requests()[0].query.get("include"), Some("cases"));
    }
}
