//! Project tools.

use serde::Deserialize;
use serde_json::Value;

use super::{code_field, limit_field, offset_field, payload};
use crate::api::projects::ProjectCreate;
use crate::api::QaseClient;
use crate::envelope::Outcome;
use crate::schema::{Field, ToolSchema};

pub fn list_projects_schema() -> ToolSchema {
    ToolSchema::new(vec![limit_field(), offset_field()])
}

pub fn get_project_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field()])
}

pub fn create_project_schema() -> ToolSchema {
    ToolSchema::new(vec![
        Field::string("code").describe("Project code, used as the key in every other tool"),
        Field::string("title"),
        Field::string("description").optional(),
        Field::string("access")
            .one_of(&["all", "group", "none"])
            .optional(),
        Field::string("group").optional().describe("Team group hash"),
        Field::any_object("settings").optional(),
    ])
}

#[derive(Debug, Deserialize)]
pub struct ListProjectsParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetProjectParams {
    pub code: String,
}

pub async fn list_projects(client: &QaseClient, params: ListProjectsParams) -> Outcome<Value> {
    payload(client.projects.list_projects(params.limit, params.offset).await)
}

pub async fn get_project(client: &QaseClient, params: GetProjectParams) -> Outcome<Value> {
    payload(client.projects.get_project(&params.code).await)
}

pub async fn create_project(client: &QaseClient, params: ProjectCreate) -> Outcome<Value> {
    payload(client.projects.create_project(&params).await)
}
