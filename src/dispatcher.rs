//! Tool catalog and dispatch.
//!
//! [`Dispatcher::dispatch`] matches a tool name exactly, validates the
//! arguments against that tool's schema, runs the operation, unwraps the
//! upstream `result` field (or keeps the whole payload when there is none)
//! and renders it as pretty JSON.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api::QaseClient;
use crate::error::ToolError;
use crate::operations::{
    cases, defects, failed_results, jira_links, plans, projects, results, runs, search,
    shared_steps, suites,
};
use crate::schema::{FieldError, ToolSchema, ValidationErrors};

/// One entry of the tool catalog.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: ToolSchema,
}

impl ToolSpec {
    fn new(name: &'static str, description: &'static str, schema: ToolSchema) -> Self {
        Self {
            name,
            description,
            schema,
        }
    }
}

/// The fixed list of tools this server exposes.
pub fn catalog() -> Vec<ToolSpec> {
    vec![
        // Projects
        ToolSpec::new("list_projects", "Get all projects", projects::list_projects_schema()),
        ToolSpec::new("get_project", "Get project by code", projects::get_project_schema()),
        ToolSpec::new("create_project", "Create new project", projects::create_project_schema()),
        // Results
        ToolSpec::new(
            "get_results",
            "Get all test run results for a project",
            results::get_results_schema(),
        ),
        ToolSpec::new(
            "get_result",
            "Get test run result by code and hash",
            results::get_result_schema(),
        ),
        ToolSpec::new("create_result", "Create test run result", results::create_result_schema()),
        ToolSpec::new(
            "create_result_bulk",
            "Create multiple test run results in bulk",
            results::create_result_bulk_schema(),
        ),
        ToolSpec::new(
            "update_result",
            "Update an existing test run result",
            results::update_result_schema(),
        ),
        ToolSpec::new(
            "get_results_by_status",
            "Get test results filtered by status (failed, passed, skipped, blocked, invalid) for a \
             specific test run. With unique=true only the latest result per test case is kept.",
            results::get_results_by_status_schema(),
        ),
        // Cases
        ToolSpec::new("get_cases", "Get all test cases in a project", cases::get_cases_schema()),
        ToolSpec::new("get_case", "Get a specific test case", cases::get_case_schema()),
        ToolSpec::new("create_case", "Create a new test case", cases::create_case_schema()),
        ToolSpec::new(
            "create_case_bulk",
            "Create multiple test cases in one request",
            cases::create_case_bulk_schema(),
        ),
        ToolSpec::new(
            "update_case",
            "Update an existing test case. Supplied params are merged into the existing ones.",
            cases::update_case_schema(),
        ),
        // Runs
        ToolSpec::new("get_runs", "Get all test runs in a project", runs::get_runs_schema()),
        ToolSpec::new("get_run", "Get a specific test run", runs::get_run_schema()),
        // Plans
        ToolSpec::new("get_plans", "Get all test plans in a project", plans::get_plans_schema()),
        ToolSpec::new("get_plan", "Get a specific test plan", plans::get_plan_schema()),
        ToolSpec::new("create_plan", "Create a new test plan", plans::create_plan_schema()),
        ToolSpec::new("update_plan", "Update an existing test plan", plans::update_plan_schema()),
        // Suites
        ToolSpec::new("get_suites", "Get all test suites in a project", suites::get_suites_schema()),
        ToolSpec::new("get_suite", "Get a specific test suite", suites::get_suite_schema()),
        ToolSpec::new("create_suite", "Create a new test suite", suites::create_suite_schema()),
        ToolSpec::new("update_suite", "Update an existing test suite", suites::update_suite_schema()),
        // Shared steps
        ToolSpec::new(
            "get_shared_steps",
            "Get all shared steps in a project",
            shared_steps::get_shared_steps_schema(),
        ),
        ToolSpec::new(
            "get_shared_step",
            "Get a specific shared step",
            shared_steps::get_shared_step_schema(),
        ),
        ToolSpec::new(
            "create_shared_step",
            "Create a new shared step",
            shared_steps::create_shared_step_schema(),
        ),
        ToolSpec::new(
            "update_shared_step",
            "Update an existing shared step",
            shared_steps::update_shared_step_schema(),
        ),
        // Jira
        ToolSpec::new(
            "link_test_case_to_jira",
            "Link a test case to a Jira issue",
            jira_links::link_test_case_to_jira_schema(),
        ),
        ToolSpec::new(
            "get_test_cases_linked_to_jira",
            "Get test cases linked to a specific Jira issue",
            jira_links::get_test_cases_linked_to_jira_schema(),
        ),
        // Defects
        ToolSpec::new("get_defects", "Get all defects in a project", defects::get_defects_schema()),
        ToolSpec::new("get_defect", "Get a specific defect by ID", defects::get_defect_schema()),
        ToolSpec::new("create_defect", "Create a new defect", defects::create_defect_schema()),
        ToolSpec::new("update_defect", "Update an existing defect", defects::update_defect_schema()),
        ToolSpec::new("delete_defect", "Delete a defect", defects::delete_defect_schema()),
        ToolSpec::new("resolve_defect", "Resolve a specific defect", defects::resolve_defect_schema()),
        ToolSpec::new(
            "update_defect_status",
            "Update the status of a defect",
            defects::update_defect_status_schema(),
        ),
        ToolSpec::new(
            "link_failed_tests_to_defect",
            "Mark the latest failed result of each test case in a run as caused by a defect",
            defects::link_failed_tests_to_defect_schema(),
        ),
        // Search
        ToolSpec::new(
            "qql_search",
            "Search Qase entities with a Qase Query Language expression",
            search::qql_search_schema(),
        ),
        // Failure analysis
        ToolSpec::new(
            "get_failed_results",
            "Get failed test results with attachments and failed steps",
            failed_results::get_failed_results_schema(),
        ),
        ToolSpec::new(
            "get_failed_results_detailed",
            "Get failed test results together with their test case details",
            failed_results::get_failed_results_detailed_schema(),
        ),
        ToolSpec::new(
            "analyze_run_failures",
            "Summarize a run's results and optionally categorize failures by stack trace",
            failed_results::analyze_run_failures_schema(),
        ),
    ]
}

/// Routes tool calls to operations.
#[derive(Clone)]
pub struct Dispatcher {
    client: QaseClient,
    tools: Vec<ToolSpec>,
}

impl Dispatcher {
    pub fn new(client: QaseClient) -> Self {
        Self {
            client,
            tools: catalog(),
        }
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Run one tool call and render its output.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name == name)
            .ok_or(ToolError::UnknownTool)?;
        let args = tool.schema.validate(&args)?;

        let output = self.run(tool.name, args).await?;
        Ok(serde_json::to_string_pretty(&unwrap_result(output))?)
    }

    async fn run(&self, name: &str, args: Map<String, Value>) -> Result<Value, ToolError> {
        let c = &self.client;
        let outcome = match name {
            "list_projects" => projects::list_projects(c, parse(args)?).await,
            "get_project" => projects::get_project(c, parse(args)?).await,
            "create_project" => projects::create_project(c, parse(args)?).await,

            "get_results" => results::get_results(c, parse(args)?).await,
            "get_result" => results::get_result(c, parse(args)?).await,
            "create_result" => results::create_result(c, parse(args)?).await,
            "create_result_bulk" => results::create_result_bulk(c, parse(args)?).await,
            "update_result" => results::update_result(c, parse(args)?).await,
            "get_results_by_status" => results::get_results_by_status(c, parse(args)?).await,

            "get_cases" => cases::get_cases(c, parse(args)?).await,
            "get_case" => cases::get_case(c, parse(args)?).await,
            "create_case" => cases::create_case(c, parse(args)?).await,
            "create_case_bulk" => cases::create_case_bulk(c, parse(args)?).await,
            "update_case" => cases::update_case(c, parse(args)?).await,

            "get_runs" => runs::get_runs(c, parse(args)?).await,
            "get_run" => runs::get_run(c, parse(args)?).await,

            "get_plans" => plans::get_plans(c, parse(args)?).await,
            "get_plan" => plans::get_plan(c, parse(args)?).await,
            "create_plan" => plans::create_plan(c, parse(args)?).await,
            "update_plan" => plans::update_plan(c, parse(args)?).await,

            "get_suites" => suites::get_suites(c, parse(args)?).await,
            "get_suite" => suites::get_suite(c, parse(args)?).await,
            "create_suite" => suites::create_suite(c, parse(args)?).await,
            "update_suite" => suites::update_suite(c, parse(args)?).await,

            "get_shared_steps" => shared_steps::get_shared_steps(c, parse(args)?).await,
            "get_shared_step" => shared_steps::get_shared_step(c, parse(args)?).await,
            "create_shared_step" => shared_steps::create_shared_step(c, parse(args)?).await,
            "update_shared_step" => shared_steps::update_shared_step(c, parse(args)?).await,

            "link_test_case_to_jira" => jira_links::link_test_case_to_jira(c, parse(args)?).await,
            "get_test_cases_linked_to_jira" => {
                jira_links::get_test_cases_linked_to_jira(c, parse(args)?).await
            }

            "get_defects" => defects::get_defects(c, parse(args)?).await,
            "get_defect" => defects::get_defect(c, parse(args)?).await,
            "create_defect" => defects::create_defect(c, parse(args)?).await,
            "update_defect" => defects::update_defect(c, parse(args)?).await,
            "delete_defect" => defects::delete_defect(c, parse(args)?).await,
            "resolve_defect" => defects::resolve_defect(c, parse(args)?).await,
            "update_defect_status" => defects::update_defect_status(c, parse(args)?).await,
            "link_failed_tests_to_defect" => {
                defects::link_failed_tests_to_defect(c, parse(args)?).await
            }

            "qql_search" => search::qql_search(c, parse(args)?).await,

            "get_failed_results" => failed_results::get_failed_results(c, parse(args)?).await,
            "get_failed_results_detailed" => {
                failed_results::get_failed_results_detailed(c, parse(args)?).await
            }
            "analyze_run_failures" => failed_results::analyze_run_failures(c, parse(args)?).await,

            _ => return Err(ToolError::UnknownTool),
        };

        outcome.map_err(|e| ToolError::Operation(e.message().to_string()))
    }
}

/// Convert validated arguments into an operation's parameter struct.
fn parse<P: DeserializeOwned>(args: Map<String, Value>) -> Result<P, ToolError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| {
        ToolError::Validation(ValidationErrors(vec![FieldError::new("", e.to_string())]))
    })
}

/// Prefer the nested `result` field; fall back to the whole payload.
pub fn unwrap_result(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}
