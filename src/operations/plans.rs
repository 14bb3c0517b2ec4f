//! Test plan tools.

use serde::Deserialize;
use serde_json::Value;

use super::{code_field, limit_field, offset_field, payload};
use crate::api::plans::{PlanCreate, PlanUpdate};
use crate::api::QaseClient;
use crate::envelope::Outcome;
use crate::schema::{Field, FieldType, ToolSchema};

pub fn get_plans_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field(), limit_field(), offset_field()])
}

pub fn get_plan_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field(), Field::integer("id")])
}

pub fn create_plan_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::string("title"),
        Field::string("description").optional(),
        Field::array("cases", FieldType::Integer).describe("Case IDs in the plan"),
    ])
}

pub fn update_plan_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("id"),
        Field::string("title").optional(),
        Field::string("description").optional(),
        Field::array("cases", FieldType::Integer).optional(),
    ])
}

#[derive(Debug, Deserialize)]
pub struct GetPlansParams {
    pub code: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetPlanParams {
    pub code: String,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanParams {
    pub code: String,
    #[serde(flatten)]
    pub plan: PlanCreate,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanParams {
    pub code: String,
    pub id: u64,
    #[serde(flatten)]
    pub plan: PlanUpdate,
}

pub async fn get_plans(client: &QaseClient, params: GetPlansParams) -> Outcome<Value> {
    payload(
        client
            .plans
            .get_plans(&params.code, params.limit, params.offset)
            .await,
    )
}

pub async fn get_plan(client: &QaseClient, params: GetPlanParams) -> Outcome<Value> {
    payload(client.plans.get_plan(&params.code, params.id).await)
}

pub async fn create_plan(client: &QaseClient, params: CreatePlanParams) -> Outcome<Value> {
    payload(client.plans.create_plan(&params.code, &params.plan).await)
}

pub async fn update_plan(client: &QaseClient, params: UpdatePlanParams) -> Outcome<Value> {
    payload(
        client
            .plans
            .update_plan(&params.code, params.id, &params.plan)
            .await,
    )
}
