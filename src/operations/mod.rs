//! Tool operations, one module per Qase entity.
//!
//! Every module exposes a schema constructor per tool, a `Deserialize`
//! parameter struct, and an async function `(&QaseClient, Params) ->
//! Outcome<Value>`. Payloads keep the upstream `{"status", "result"}` shape
//! so the dispatcher can unwrap every tool the same way.

pub mod cases;
pub mod defects;
pub mod failed_results;
pub mod jira_links;
pub mod plans;
pub mod projects;
pub mod results;
pub mod runs;
pub mod search;
pub mod shared_steps;
pub mod suites;

use serde::Serialize;
use serde_json::Value;

use crate::api::QaseResponse;
use crate::envelope::{IntoOutcome, Outcome};
use crate::schema::{Field, FieldType};

/// Turn a typed client response into an operation payload.
pub(crate) fn payload<T: Serialize, E: std::fmt::Display>(
    response: Result<T, E>,
) -> Outcome<Value> {
    response
        .into_outcome()
        .and_then(|body| serde_json::to_value(body).into_outcome())
}

/// Wrap a locally computed result in the upstream envelope.
pub(crate) fn wrapped<T: Serialize>(result: T) -> Outcome<Value> {
    serde_json::to_value(QaseResponse::ok(result)).into_outcome()
}

pub(crate) fn code_field() -> Field {
    Field::string("code").describe("Project code")
}

pub(crate) fn limit_field() -> Field {
    Field::integer("limit")
        .optional()
        .describe("Number of entities in result set")
}

pub(crate) fn offset_field() -> Field {
    Field::integer("offset")
        .optional()
        .describe("Number of entities to skip")
}

pub(crate) fn string_list(name: &'static str) -> Field {
    Field::array(name, FieldType::String)
}
