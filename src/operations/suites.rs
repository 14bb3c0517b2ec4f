//! Test suite tools.

use serde::Deserialize;
use serde_json::Value;

use super::{code_field, limit_field, offset_field, payload};
use crate::api::suites::SuiteData;
use crate::api::QaseClient;
use crate::envelope::Outcome;
use crate::schema::{Field, ToolSchema};

fn suite_fields(title_required: bool) -> Vec<Field> {
    let title = if title_required {
        Field::string("title")
    } else {
        Field::string("title").optional()
    };
    vec![
        title,
        Field::string("description").optional(),
        Field::string("preconditions").optional(),
        Field::integer("parent_id").optional().describe("Parent suite ID"),
    ]
}

pub fn get_suites_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::string("search").optional(),
        limit_field(),
        offset_field(),
    ])
}

pub fn get_suite_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field(), Field::integer("id")])
}

pub fn create_suite_schema() -> ToolSchema {
    let mut fields = vec![code_field()];
    fields.extend(suite_fields(true));
    ToolSchema::new(fields)
}

pub fn update_suite_schema() -> ToolSchema {
    let mut fields = vec![code_field(), Field::integer("id")];
    fields.extend(suite_fields(false));
    ToolSchema::new(fields)
}

#[derive(Debug, Deserialize)]
pub struct GetSuitesParams {
    pub code: String,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetSuiteParams {
    pub code: String,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSuiteParams {
    pub code: String,
    #[serde(flatten)]
    pub suite: SuiteData,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSuiteParams {
    pub code: String,
    pub id: u64,
    #[serde(flatten)]
    pub suite: SuiteData,
}

pub async fn get_suites(client: &QaseClient, params: GetSuitesParams) -> Outcome<Value> {
    payload(
        client
            .suites
            .get_suites(
                &params.code,
                params.search.as_deref(),
                params.limit,
                params.offset,
            )
            .await,
    )
}

pub async fn get_suite(client: &QaseClient, params: GetSuiteParams) -> Outcome<Value> {
    payload(client.suites.get_suite(&params.code, params.id).await)
}

pub async fn create_suite(client: &QaseClient, params: CreateSuiteParams) -> Outcome<Value> {
    payload(client.suites.create_suite(&params.code, &params.suite).await)
}

pub async fn update_suite(client: &QaseClient, params: UpdateSuiteParams) -> Outcome<Value> {
    payload(
        client
            .suites
            .update_suite(&params.code, params.id, &params.suite)
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
    async fn test_update_suite_moves_under_parent() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::PATCH,
            "/suite/DEMO/12",
            json!({"status": true, "result": {"id": 12}}),
        );

        let args = update_suite_schema()
            .validate(&json!({"code": "DEMO", "id": 12, "parent_id": 3}))
            .unwrap();
        let params: UpdateSuiteParams = serde_json::from_value(Value::Object(args)).unwrap();
        update_suite(&client(&transport), params).await.unwrap();

        assert_eq!(transport.requests()[0].body, Some(json!({"parent_id": 3})));
    }
}
