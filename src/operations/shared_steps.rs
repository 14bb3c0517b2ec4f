//! Shared step tools.

use serde::Deserialize;
use serde_json::Value;

use super::{code_field, limit_field, offset_field, payload};
use crate::api::shared_steps::SharedStepData;
use crate::api::QaseClient;
use crate::envelope::Outcome;
use crate::schema::{Field, FieldType, ToolSchema};

fn shared_step_fields(title_required: bool) -> Vec<Field> {
    let title = if title_required {
        Field::string("title")
    } else {
        Field::string("title").optional()
    };
    vec![
        title,
        Field::string("action")
            .optional()
            .describe("Single action; use steps for several"),
        Field::string("expected_result").optional(),
        Field::string("data").optional(),
        Field::array(
            "steps",
            FieldType::Object(vec![
                Field::string("action"),
                Field::string("expected_result").optional(),
                Field::string("data").optional(),
            ]),
        )
        .optional(),
    ]
}

pub fn get_shared_steps_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::string("search").optional(),
        limit_field(),
        offset_field(),
    ])
}

pub fn get_shared_step_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field(), Field::string("hash")])
}

pub fn create_shared_step_schema() -> ToolSchema {
    let mut fields = vec![code_field()];
    fields.extend(shared_step_fields(true));
    ToolSchema::new(fields)
}

pub fn update_shared_step_schema() -> ToolSchema {
    let mut fields = vec![code_field(), Field::string("hash")];
    fields.extend(shared_step_fields(false));
    ToolSchema::new(fields)
}

#[derive(Debug, Deserialize)]
pub struct GetSharedStepsParams {
    pub code: String,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetSharedStepParams {
    pub code: String,
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSharedStepParams {
    pub code: String,
    #[serde(flatten)]
    pub step: SharedStepData,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSharedStepParams {
    pub code: String,
    pub hash: String,
    #[serde(flatten)]
    pub step: SharedStepData,
}

pub async fn get_shared_steps(client: &QaseClient, params: GetSharedStepsParams) -> Outcome<Value> {
    payload(
        client
            .shared_steps
            .get_shared_steps(
                &params.code,
                params.search.as_deref(),
                params.limit,
                params.offset,
            )
            .await,
    )
}

pub async fn get_shared_step(client: &QaseClient, params: GetSharedStepParams) -> Outcome<Value> {
    payload(
        client
            .shared_steps
            .get_shared_step(&params.code, &params.hash)
            .await,
    )
}

pub async fn create_shared_step(
    client: &QaseClient,
    params: CreateSharedStepParams,
) -> Outcome<Value> {
    payload(
        client
            .shared_steps
            .create_shared_step(&params.code, &params.step)
            .await,
    )
}

pub async fn update_shared_step(
    client: &QaseClient,
    params: UpdateSharedStepParams,
) -> Outcome<Value> {
    payload(
        client
            .shared_steps
            .update_shared_step(&params.code, &params.hash, &params.step)
            .await,
    )
}
