//! Test result tools and per-case deduplication.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{code_field, limit_field, offset_field, payload, wrapped};
use crate::api::results::ResultsQuery;
use crate::api::{EntityList, ListResponse, QaseClient, RawResponse};
use crate::envelope::{IntoOutcome, Outcome};
use crate::schema::{Field, FieldType, ToolSchema};

/// Result statuses accepted as filters.
pub const RESULT_STATUSES: &[&str] = &[
    "passed",
    "failed",
    "blocked",
    "skipped",
    "invalid",
    "in_progress",
];

/// Page size fetched before deduplicating by case.
pub const UNIQUE_FETCH_LIMIT: u32 = 100;

pub fn get_results_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        limit_field(),
        offset_field(),
        Field::string("status").one_of(RESULT_STATUSES).optional(),
        Field::string("from")
            .optional()
            .describe("Lower bound on end time, Y-m-d H:i:s"),
        Field::string("to")
            .optional()
            .describe("Upper bound on end time, Y-m-d H:i:s"),
    ])
}

pub fn get_result_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field(), Field::string("hash")])
}

pub fn create_result_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("id").describe("Run ID"),
        Field::any_object("result").describe("Result fields: case_id, status, comment, stacktrace, time_ms, ..."),
    ])
}

pub fn create_result_bulk_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("id").describe("Run ID"),
        Field::array("results", FieldType::AnyObject),
    ])
}

pub fn update_result_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("id").describe("Run ID"),
        Field::string("hash"),
        Field::any_object("result"),
    ])
}

pub fn get_results_by_status_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("runId"),
        Field::string("status").one_of(RESULT_STATUSES),
        Field::boolean("unique")
            .default(Value::Bool(false))
            .describe("Keep only the latest result per test case"),
        limit_field(),
        offset_field(),
        Field::string("from").optional(),
        Field::string("to").optional(),
    ])
}

#[derive(Debug, Deserialize)]
pub struct GetResultsParams {
    pub code: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetResultParams {
    pub code: String,
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateResultParams {
    pub code: String,
    pub id: u64,
    pub result: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateResultBulkParams {
    pub code: String,
    pub id: u64,
    pub results: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResultParams {
    pub code: String,
    pub id: u64,
    pub hash: String,
    pub result: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsByStatusParams {
    pub code: String,
    pub run_id: u64,
    pub status: String,
    #[serde(default)]
    pub unique: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn get_results(client: &QaseClient, params: GetResultsParams) -> Outcome<Value> {
    let query = ResultsQuery {
        status: params.status,
        from_end_time: params.from,
        to_end_time: params.to,
        limit: params.limit,
        offset: params.offset,
        ..Default::default()
    };
    payload(client.results.get_results::<RawResponse>(&params.code, &query).await)
}

pub async fn get_result(client: &QaseClient, params: GetResultParams) -> Outcome<Value> {
    payload(client.results.get_result(&params.code, &params.hash).await)
}

pub async fn create_result(client: &QaseClient, params: CreateResultParams) -> Outcome<Value> {
    payload(
        client
            .results
            .create_result(&params.code, params.id, &params.result)
            .await,
    )
}

pub async fn create_result_bulk(
    client: &QaseClient,
    params: CreateResultBulkParams,
) -> Outcome<Value> {
    payload(
        client
            .results
            .create_result_bulk(&params.code, params.id, &params.results)
            .await,
    )
}

pub async fn update_result(client: &QaseClient, params: UpdateResultParams) -> Outcome<Value> {
    payload(
        client
            .results
            .update_result(&params.code, params.id, &params.hash, &params.result)
            .await,
    )
}

/// Deduplicated page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueResults {
    pub total: u64,
    /// Number of distinct cases found, before the caller's slice.
    pub filtered: u64,
    pub count: u64,
    /// Upstream result objects, undecoded.
    pub entities: Vec<Value>,
}

pub async fn get_results_by_status(
    client: &QaseClient,
    params: ResultsByStatusParams,
) -> Outcome<Value> {
    if params.unique {
        let page = unique_results_by_status(client, &params).await?;
        return wrapped(page);
    }

    let query = ResultsQuery {
        status: Some(params.status),
        run: Some(params.run_id.to_string()),
        from_end_time: params.from,
        to_end_time: params.to,
        limit: params.limit,
        offset: params.offset,
        ..Default::default()
    };
    payload(client.results.get_results::<RawResponse>(&params.code, &query).await)
}

/// Fetch one large page for the run, keep the latest result per case, then
/// apply the caller's offset and limit to what is left.
pub async fn unique_results_by_status(
    client: &QaseClient,
    params: &ResultsByStatusParams,
) -> Outcome<UniqueResults> {
    let query = ResultsQuery {
        status: Some(params.status.clone()),
        run: Some(params.run_id.to_string()),
        from_end_time: params.from.clone(),
        to_end_time: params.to.clone(),
        limit: Some(UNIQUE_FETCH_LIMIT),
        offset: Some(0),
        ..Default::default()
    };
    let response: ListResponse<Value> = client
        .results
        .get_results(&params.code, &query)
        .await
        .into_outcome()?;
    let list = response.result.unwrap_or(EntityList {
        total: None,
        filtered: None,
        count: None,
        entities: Vec::new(),
    });

    let unique = unique_by_case(list.entities);
    let filtered = unique.len() as u64;
    let offset = params.offset.unwrap_or(0) as usize;
    let limit = params.limit.map_or(usize::MAX, |l| l as usize);
    let entities: Vec<Value> = unique.into_iter().skip(offset).take(limit).collect();

    tracing::debug!(
        run_id = params.run_id,
        filtered,
        returned = entities.len(),
        "deduplicated results by case"
    );

    Ok(UniqueResults {
        total: list.total.unwrap_or(filtered),
        filtered,
        count: entities.len() as u64,
        entities,
    })
}

/// Keep the last result seen for each case ID, in original order. Results
/// without a case ID are all kept.
pub fn unique_by_case(entities: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Value> = entities
        .into_iter()
        .rev()
        .filter(|result| match result.get("case_id").and_then(Value::as_u64) {
            Some(id) => seen.insert(id),
            None => true,
        })
        .collect();
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use reqwest::Method;
    use serde_json::json;

    fn result(hash: &str, case_id: u64) -> Value {
        json!({"hash": hash, "case_id": case_id, "status": "failed"})
    }

    fn by_status(args: Value) -> ResultsByStatusParams {
        let normalized = get_results_by_status_schema().validate(&args).unwrap();
        serde_json::from_value(Value::Object(normalized)).unwrap()
    }

    #[tokio::test]
    async fn test_unique_keeps_newest_result_per_case() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/result/DEMO",
            json!({"status": true, "result": {"total": 3, "filtered": 3, "count": 3,
                "entities": [result("old7", 7), result("new7", 7), result("only9", 9)]}}),
        );

        let params = by_status(json!({
            "code": "DEMO", "runId": 1, "status": "failed",
            "unique": true, "limit": 1, "offset": 0
        }));
        let outcome = get_results_by_status(&client(&transport), params)
            .await
            .unwrap();

        let page = &outcome["result"];
        assert_eq!(page["filtered"], 2);
        assert_eq!(page["count"], 1);
        assert_eq!(page["entities"][0]["hash"], "new7");

        let sent = &transport.requests()[0].query;
        assert_eq!(sent.get("limit"), Some("100"));
        assert_eq!(sent.get("offset"), Some("0"));
        assert_eq!(sent.get("run"), Some("1"));
    }

    #[tokio::test]
    async fn test_unique_entities_are_forwarded_untouched() {
        let transport = FakeTransport::new();
        let latest = json!({
            "hash": "new7", "case_id": 7, "status": "failed",
            "comment": null, "stacktrace": null, "custom_flag": "x"
        });
        transport.respond(
            Method::GET,
            "/result/DEMO",
            json!({"status": true, "result": {"total": 2,
                "entities": [result("old7", 7), latest.clone()]}}),
        );

        let params = by_status(json!({
            "code": "DEMO", "runId": 1, "status": "failed", "unique": true
        }));
        let outcome = get_results_by_status(&client(&transport), params)
            .await
            .unwrap();

        assert_eq!(outcome["result"]["entities"], json!([latest]));
    }

    #[tokio::test]
    async fn test_unique_offset_slices_deduplicated_sequence() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/result/DEMO",
            json!({"status": true, "result": {"total": 3,
                "entities": [result("old7", 7), result("new7", 7), result("only9", 9)]}}),
        );

        let params = by_status(json!({
            "code": "DEMO", "runId": 1, "status": "failed", "unique": true, "offset": 1
        }));
        let outcome = get_results_by_status(&client(&transport), params)
            .await
            .unwrap();

        assert_eq!(outcome["result"]["entities"], json!([result("only9", 9)]));
        assert_eq!(outcome["result"]["total"], 3);
    }

    #[tokio::test]
    async fn test_without_unique_forwards_caller_paging() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/result/DEMO",
            json!({"status": true, "result": {"total": 0, "entities": []}}),
        );

        let params = by_status(json!({
            "code": "DEMO", "runId": 4, "status": "passed", "limit": 5, "offset": 10,
            "from": "2024-01-01 00:00:00"
        }));
        get_results_by_status(&client(&transport), params)
            .await
            .unwrap();

        let sent = &transport.requests()[0].query;
        assert_eq!(sent.get("limit"), Some("5"));
        assert_eq!(sent.get("offset"), Some("10"));
        assert_eq!(sent.get("status"), Some("passed"));
        assert_eq!(sent.get("from_end_time"), Some("2024-01-01 00:00:00"));
    }

    #[test]
    fn test_unique_by_case_at_most_one_per_case() {
        let mut entities: Vec<Value> = [("a", 1), ("b", 2), ("c", 1), ("d", 2), ("e", 3)]
            .iter()
            .map(|(h, c)| result(h, *c))
            .collect();
        entities.push(json!({"hash": "loose", "case_id": null}));
        entities.push(json!({"hash": "loose2"}));

        let hashes: Vec<String> = unique_by_case(entities)
            .iter()
            .filter_map(|r| r["hash"].as_str().map(String::from))
            .collect();
        assert_eq!(hashes, vec!["c", "d", "e", "loose", "loose2"]);
    }

    #[test]
    fn test_by_status_requires_known_status() {
        let errors = get_results_by_status_schema()
            .validate(&json!({"code": "DEMO", "runId": 1, "status": "broken"}))
            .unwrap_err();
        assert_eq!(errors.fields()[0].path, "status");
    }

    #[tokio::test]
    async fn test_get_results_maps_time_window() {
        let transport = FakeTransport::new();
        transport.respond(Method::GET, "/result/DEMO", json!({"status": true, "result": {"entities": []}}));

        let args = get_results_schema()
            .validate(&json!({"code": "DEMO", "status": "failed", "to": "2024-02-01 00:00:00"}))
            .unwrap();
        let params: GetResultsParams = serde_json::from_value(Value::Object(args)).unwrap();
        get_results(&client(&transport), params).await.unwrap();

        let sent = &transport.requests()[0].query;
        assert_eq!(sent.get("status"), Some("failed"));
        assert_eq!(sent.get("to_end_time"), Some("2024-02-01 00:00:00"));
        assert_eq!(sent.get("from_end_time"), None);
    }
}
