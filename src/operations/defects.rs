//! Defect tools, including linking a run's failed results to a defect.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::results::{unique_results_by_status, ResultsByStatusParams};
use super::{code_field, limit_field, offset_field, payload, string_list, wrapped};
use crate::api::defects::{Defect, DefectCreate, DefectUpdate};
use crate::api::results::TestResult;
use crate::api::{QaseClient, QaseResponse, RawResponse};
use crate::envelope::{IntoOutcome, Outcome};
use crate::schema::{Field, FieldType, ToolSchema};

pub const DEFECT_STATUSES: &[&str] = &["open", "resolved", "in_progress", "invalid"];

/// Statuses a defect can be moved to.
pub const DEFECT_TARGET_STATUSES: &[&str] = &["in_progress", "resolved", "invalid"];

fn defect_fields(create: bool) -> Vec<Field> {
    let required = |field: Field| if create { field } else { field.optional() };
    vec![
        required(Field::string("title")),
        required(Field::string("actual_result")),
        required(Field::integer("severity")),
        Field::integer("milestone_id")
            .optional()
            .nullable()
            .describe("null detaches the milestone"),
        string_list("attachments").optional().describe("Attachment hashes"),
        Field::record("custom_field", FieldType::String).optional(),
        string_list("tags").optional(),
    ]
}

fn code_and_id() -> ToolSchema {
    ToolSchema::new(vec![code_field(), Field::integer("id")])
}

pub fn get_defects_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::string("status").one_of(DEFECT_STATUSES).optional(),
        limit_field(),
        offset_field(),
    ])
}

pub fn get_defect_schema() -> ToolSchema {
    code_and_id()
}

pub fn create_defect_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field(), Field::object("defect", defect_fields(true))])
}

pub fn update_defect_schema() -> ToolSchema {
    let mut fields = vec![code_field(), Field::integer("id")];
    fields.extend(defect_fields(false));
    ToolSchema::new(fields)
}

pub fn delete_defect_schema() -> ToolSchema {
    code_and_id()
}

pub fn resolve_defect_schema() -> ToolSchema {
    code_and_id()
}

pub fn update_defect_status_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("id"),
        Field::string("status").one_of(DEFECT_TARGET_STATUSES),
    ])
}

pub fn link_failed_tests_to_defect_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("defectId"),
        Field::integer("runId").describe("Run whose failed results are linked"),
        Field::array("caseIds", FieldType::Integer)
            .optional()
            .describe("Only link results for these cases"),
        Field::string("comment")
            .optional()
            .describe("Note appended to each result; defaults to the defect reference"),
    ])
}

#[derive(Debug, Deserialize)]
pub struct GetDefectsParams {
    pub code: String,
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DefectIdParams {
    pub code: String,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateDefectParams {
    pub code: String,
    pub defect: DefectCreate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDefectParams {
    pub code: String,
    pub id: u64,
    #[serde(flatten)]
    pub defect: DefectUpdate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDefectStatusParams {
    pub code: String,
    pub id: u64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFailedTestsParams {
    pub code: String,
    pub defect_id: u64,
    pub run_id: u64,
    pub case_ids: Option<Vec<u64>>,
    pub comment: Option<String>,
}

pub async fn get_defects(client: &QaseClient, params: GetDefectsParams) -> Outcome<Value> {
    payload(
        client
            .defects
            .get_defects(
                &params.code,
                params.status.as_deref(),
                params.limit,
                params.offset,
            )
            .await,
    )
}

pub async fn get_defect(client: &QaseClient, params: DefectIdParams) -> Outcome<Value> {
    payload(client.defects.get_defect::<RawResponse>(&params.code, params.id).await)
}

pub async fn create_defect(client: &QaseClient, params: CreateDefectParams) -> Outcome<Value> {
    payload(client.defects.create_defect(&params.code, &params.defect).await)
}

pub async fn update_defect(client: &QaseClient, params: UpdateDefectParams) -> Outcome<Value> {
    payload(
        client
            .defects
            .update_defect(&params.code, params.id, &params.defect)
            .await,
    )
}

pub async fn delete_defect(client: &QaseClient, params: DefectIdParams) -> Outcome<Value> {
    payload(client.defects.delete_defect(&params.code, params.id).await)
}

pub async fn resolve_defect(client: &QaseClient, params: DefectIdParams) -> Outcome<Value> {
    payload(client.defects.resolve_defect(&params.code, params.id).await)
}

pub async fn update_defect_status(
    client: &QaseClient,
    params: UpdateDefectStatusParams,
) -> Outcome<Value> {
    payload(
        client
            .defects
            .update_defect_status(&params.code, params.id, &params.status)
            .await,
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkedTest {
    hash: String,
    case_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailedLink {
    hash: Option<String>,
    case_id: Option<u64>,
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkReport {
    defect_id: u64,
    defect_title: String,
    run_id: u64,
    linked_tests_count: usize,
    failed_links_count: usize,
    linked_tests: Vec<LinkedTest>,
    failed_links: Vec<FailedLink>,
    message: String,
}

/// Mark the run's failed results as caused by a defect.
///
/// The defect and run lookups must succeed; after that each result is
/// updated in turn and a failed update is recorded without stopping the
/// batch.
pub async fn link_failed_tests_to_defect(
    client: &QaseClient,
    params: LinkFailedTestsParams,
) -> Outcome<Value> {
    let defect: QaseResponse<Defect> = client
        .defects
        .get_defect(&params.code, params.defect_id)
        .await
        .into_outcome()?;
    let defect_title = defect.result.and_then(|d| d.title).unwrap_or_default();

    client
        .runs
        .get_run(&params.code, params.run_id, None)
        .await
        .into_outcome()?;

    let lookup = ResultsByStatusParams {
        code: params.code.clone(),
        run_id: params.run_id,
        status: "failed".to_string(),
        unique: true,
        limit: None,
        offset: None,
        from: None,
        to: None,
    };
    let failed = unique_results_by_status(client, &lookup).await?;

    let mut targets = Vec::new();
    for entity in failed.entities {
        let result: TestResult = serde_json::from_value(entity).into_outcome()?;
        let wanted = match &params.case_ids {
            Some(ids) => result.case_id.is_some_and(|id| ids.contains(&id)),
            None => true,
        };
        if wanted {
            targets.push(result);
        }
    }

    let mut report = LinkReport {
        defect_id: params.defect_id,
        defect_title,
        run_id: params.run_id,
        linked_tests_count: 0,
        failed_links_count: 0,
        linked_tests: Vec::new(),
        failed_links: Vec::new(),
        message: String::new(),
    };

    if targets.is_empty() {
        report.message = format!(
            "No failed test results found in run {} to link to defect #{}",
            params.run_id, params.defect_id
        );
        return wrapped(report);
    }

    let note = params.comment.clone().unwrap_or_else(|| {
        format!("Linked to defect #{}: {}", params.defect_id, report.defect_title)
    });

    for result in targets {
        let Some(hash) = result.hash.clone() else {
            report.failed_links.push(FailedLink {
                hash: None,
                case_id: result.case_id,
                error: "Result has no hash".to_string(),
            });
            continue;
        };

        let update = defect_link_update(result.comment.as_deref(), &note);
        match client
            .results
            .update_result(&params.code, params.run_id, &hash, &update)
            .await
        {
            Ok(_) => report.linked_tests.push(LinkedTest {
                hash,
                case_id: result.case_id,
            }),
            Err(e) => {
                tracing::warn!(hash = %hash, error = %e, "failed to link result to defect");
                report.failed_links.push(FailedLink {
                    hash: Some(hash),
                    case_id: result.case_id,
                    error: e.to_string(),
                });
            }
        }
    }

    report.linked_tests_count = report.linked_tests.len();
    report.failed_links_count = report.failed_links.len();
    report.message = if report.failed_links_count == 0 {
        format!(
            "Linked {} failed test result(s) to defect #{}",
            report.linked_tests_count, params.defect_id
        )
    } else {
        format!(
            "Linked {} failed test result(s) to defect #{}; {} could not be updated",
            report.linked_tests_count, params.defect_id, report.failed_links_count
        )
    };

    wrapped(report)
}

/// Result update that flags the defect and appends `note` to the comment.
fn defect_link_update(existing_comment: Option<&str>, note: &str) -> Map<String, Value> {
    let comment = match existing_comment.filter(|c| !c.trim().is_empty()) {
        Some(existing) => format!("{}\n\n{}", existing, note),
        None => note.to_string(),
    };

    let mut update = Map::new();
    update.insert("defect".into(), Value::Bool(true));
    update.insert("comment".into(), Value::String(comment));
    update
}
