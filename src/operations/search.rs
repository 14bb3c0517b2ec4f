//! QQL search tool.

use serde::Deserialize;
use serde_json::{json, Value};

use super::payload;
use crate::api::QaseClient;
use crate::envelope::Outcome;
use crate::schema::{Field, ToolSchema};

pub fn qql_search_schema() -> ToolSchema {
    ToolSchema::new(vec![
        Field::string("query")
            .range(1, 1000)
            .describe("Expression in Qase Query Language, e.g. entity = \"defect\" and status = \"open\""),
        Field::integer("limit")
            .range(1, 100)
            .default(json!(10))
            .describe("Number of entities in result set"),
        Field::integer("offset")
            .range(0, 100_000)
            .default(json!(0))
            .describe("Number of entities to skip for pagination"),
    ])
}

#[derive(Debug, Deserialize)]
pub struct QqlSearchParams {
    pub query: String,
    pub limit: u32,
    pub offset: u32,
}

pub async fn qql_search(client: &QaseClient, params: QqlSearchParams) -> Outcome<Value> {
    payload(
        client
            .search
            .search(&params.query, params.limit, params.offset)
            .await,
    )
}
