//! Failed-result reporting and run failure analysis.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{code_field, wrapped};
use crate::api::cases::TestCase;
use crate::api::results::{ResultsQuery, TestResult};
use crate::api::{EntityList, ListResponse, QaseClient, QaseResponse};
use crate::envelope::{IntoOutcome, Outcome};
use crate::schema::{Field, ToolSchema};

pub const DEFAULT_FAILED_LIMIT: u32 = 50;

/// Page size used when analyzing a run.
pub const ANALYSIS_PAGE_SIZE: u32 = 100;

fn run_id_field() -> Field {
    Field::string_or_integer("runId").describe("Run ID")
}

fn failed_result_fields() -> Vec<Field> {
    vec![
        code_field(),
        run_id_field().optional(),
        Field::integer("limit")
            .range(1, 100)
            .optional()
            .describe("Number of results to return (1-100)"),
        Field::integer("offset")
            .range(0, 100_000)
            .optional()
            .describe("Number of results to skip"),
        Field::string("fromEndTime")
            .optional()
            .describe("From end time in format Y-m-d H:i:s"),
        Field::string("toEndTime")
            .optional()
            .describe("To end time in format Y-m-d H:i:s"),
    ]
}

pub fn get_failed_results_schema() -> ToolSchema {
    ToolSchema::new(failed_result_fields())
}

pub fn get_failed_results_detailed_schema() -> ToolSchema {
    let mut fields = failed_result_fields();
    fields.push(
        Field::boolean("includeSteps")
            .optional()
            .describe("Include the test case steps"),
    );
    fields.push(
        Field::boolean("includeAttachments")
            .default(Value::Bool(true))
            .describe("Include attachment details"),
    );
    ToolSchema::new(fields)
}

pub fn analyze_run_failures_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        run_id_field(),
        Field::boolean("includeStacktraces")
            .optional()
            .describe("Include full stack traces instead of availability markers"),
        Field::boolean("categorizeFailures")
            .optional()
            .describe("Group failures by stack trace keywords"),
    ])
}

/// A run ID given either as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RunRef {
    Id(u64),
    Text(String),
}

impl RunRef {
    pub fn as_id(&self) -> Option<u64> {
        match self {
            RunRef::Id(id) => Some(*id),
            RunRef::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for RunRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunRef::Id(id) => write!(f, "{}", id),
            RunRef::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedResultsParams {
    pub code: String,
    pub run_id: Option<RunRef>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub from_end_time: Option<String>,
    pub to_end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedResultsDetailedParams {
    #[serde(flatten)]
    pub filter: FailedResultsParams,
    #[serde(default)]
    pub include_steps: bool,
    #[serde(default = "default_true")]
    pub include_attachments: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRunParams {
    pub code: String,
    pub run_id: RunRef,
    #[serde(default)]
    pub include_stacktraces: bool,
    #[serde(default)]
    pub categorize_failures: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentSummary {
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub mime: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedStep {
    pub position: Option<i64>,
    pub status: Option<i64>,
    pub attachments: Vec<Value>,
}

/// A failed result reshaped for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedResult {
    pub hash: Option<String>,
    pub run_id: Option<u64>,
    pub case_id: Option<u64>,
    pub status: Option<String>,
    pub comment: Option<String>,
    pub stacktrace: Option<String>,
    pub time_spent_ms: Option<u64>,
    pub end_time: Option<String>,
    pub attachments: Vec<AttachmentSummary>,
    pub failed_steps: Vec<FailedStep>,
}

impl From<TestResult> for FailedResult {
    fn from(result: TestResult) -> Self {
        let failed_steps = result
            .failed_steps()
            .map(|step| FailedStep {
                position: step.position,
                status: step.status,
                attachments: step.attachments.clone().unwrap_or_default(),
            })
            .collect();
        let attachments = result
            .attachments
            .unwrap_or_default()
            .into_iter()
            .map(|a| AttachmentSummary {
                filename: a.filename,
                size: a.size,
                mime: a.mime,
                url: a.url,
            })
            .collect();

        Self {
            hash: result.hash,
            run_id: result.run_id,
            case_id: result.case_id,
            status: result.status,
            comment: result.comment,
            stacktrace: result.stacktrace,
            time_spent_ms: result.time_spent_ms,
            end_time: result.end_time,
            attachments,
            failed_steps,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedResults {
    pub total: u64,
    pub filtered: u64,
    pub count: usize,
    pub failed_results: Vec<FailedResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResult {
    #[serde(flatten)]
    pub result: FailedResult,
    pub test_case: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResults {
    pub total: u64,
    pub filtered: u64,
    pub count: usize,
    pub failed_results_detailed: Vec<DetailedResult>,
}

pub async fn get_failed_results(client: &QaseClient, params: FailedResultsParams) -> Outcome<Value> {
    wrapped(fetch_failed_results(client, &params).await?)
}

async fn fetch_failed_results(
    client: &QaseClient,
    params: &FailedResultsParams,
) -> Outcome<FailedResults> {
    let query = ResultsQuery {
        status: Some("failed".to_string()),
        run: params.run_id.as_ref().map(ToString::to_string),
        from_end_time: params.from_end_time.clone(),
        to_end_time: params.to_end_time.clone(),
        limit: Some(params.limit.unwrap_or(DEFAULT_FAILED_LIMIT)),
        offset: Some(params.offset.unwrap_or(0)),
        ..Default::default()
    };
    let list = client
        .results
        .get_results::<ListResponse<TestResult>>(&params.code, &query)
        .await
        .into_outcome()?
        .result
        .unwrap_or_else(empty_list);

    let failed_results: Vec<FailedResult> = list
        .entities
        .into_iter()
        .filter(|result| result.has_status("failed"))
        .map(FailedResult::from)
        .collect();

    Ok(FailedResults {
        total: list.total.unwrap_or(0),
        filtered: list.filtered.unwrap_or(0),
        count: failed_results.len(),
        failed_results,
    })
}

/// Failed results enriched with their test case. Cases are fetched one at
/// a time; a failed lookup becomes a placeholder instead of an error.
pub async fn get_failed_results_detailed(
    client: &QaseClient,
    params: FailedResultsDetailedParams,
) -> Outcome<Value> {
    let failed = fetch_failed_results(client, &params.filter).await?;

    let mut detailed = Vec::with_capacity(failed.failed_results.len());
    for mut result in failed.failed_results {
        if !params.include_attachments {
            result.attachments.clear();
        }
        let test_case = match result.case_id {
            Some(case_id) => {
                match client
                    .cases
                    .get_case::<QaseResponse<TestCase>>(&params.filter.code, case_id)
                    .await
                {
                    Ok(response) => match response.result {
                        Some(case) => case_summary(&case, params.include_steps),
                        None => case_placeholder(Some(case_id)),
                    },
                    Err(e) => {
                        tracing::debug!(case_id, error = %e, "test case lookup failed");
                        case_placeholder(Some(case_id))
                    }
                }
            }
            None => case_placeholder(None),
        };
        detailed.push(DetailedResult { result, test_case });
    }

    wrapped(DetailedResults {
        total: failed.total,
        filtered: failed.filtered,
        count: detailed.len(),
        failed_results_detailed: detailed,
    })
}

fn case_summary(case: &TestCase, include_steps: bool) -> Value {
    let mut summary = Map::new();
    summary.insert("id".into(), json!(case.id));
    summary.insert("title".into(), json!(case.title));
    summary.insert("description".into(), json!(case.description));
    summary.insert(
        "suite".into(),
        match case.suite_id {
            Some(id) => json!({"id": id, "title": "Suite information not available"}),
            None => Value::Null,
        },
    );
    summary.insert("severity".into(), json!(case.severity));
    summary.insert("priority".into(), json!(case.priority));
    summary.insert("type".into(), json!(case.case_type));
    summary.insert("behavior".into(), json!(case.behavior));
    summary.insert("automation".into(), json!(case.automation));
    if include_steps {
        summary.insert("steps".into(), json!(case.steps));
    }
    Value::Object(summary)
}

fn case_placeholder(case_id: Option<u64>) -> Value {
    json!({
        "id": case_id,
        "title": "Unable to fetch test case details",
        "description": null,
        "error": "Failed to retrieve test case information"
    })
}

/// Bucket a failure falls into, judged from its stack trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Assertion,
    Timeout,
    Network,
    NullReference,
    Other,
    NoStacktrace,
}

impl FailureCategory {
    pub fn key(self) -> &'static str {
        match self {
            FailureCategory::Assertion => "assertionErrors",
            FailureCategory::Timeout => "timeoutErrors",
            FailureCategory::Network => "networkErrors",
            FailureCategory::NullReference => "nullPointerErrors",
            FailureCategory::Other => "otherErrors",
            FailureCategory::NoStacktrace => "noStacktraceErrors",
        }
    }
}

/// Classify a stack trace by keyword. The first matching rule wins.
pub fn categorize_failure(stacktrace: Option<&str>) -> FailureCategory {
    let Some(trace) = stacktrace.filter(|t| !t.is_empty()) else {
        return FailureCategory::NoStacktrace;
    };
    let trace = trace.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| trace.contains(w));

    if has(&["assertion", "assert"]) {
        FailureCategory::Assertion
    } else if has(&["timeout"]) {
        FailureCategory::Timeout
    } else if has(&["connection", "network"]) {
        FailureCategory::Network
    } else if has(&["null", "undefined"]) {
        FailureCategory::NullReference
    } else {
        FailureCategory::Other
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunStatistics {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    blocked: usize,
    pass_rate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureSummary {
    hash: Option<String>,
    case_id: Option<u64>,
    comment: Option<String>,
    stacktrace: Value,
    time_spent_ms: Option<u64>,
    end_time: Option<String>,
    has_attachments: bool,
    failed_steps_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunAnalysis {
    run_id: Option<u64>,
    statistics: RunStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_categories: Option<Map<String, Value>>,
    failures: Vec<FailureSummary>,
    analysis_timestamp: String,
}

/// Statistics and failure breakdown over the first page of a run's results.
pub async fn analyze_run_failures(client: &QaseClient, params: AnalyzeRunParams) -> Outcome<Value> {
    let query = ResultsQuery {
        run: Some(params.run_id.to_string()),
        limit: Some(ANALYSIS_PAGE_SIZE),
        offset: Some(0),
        ..Default::default()
    };
    let results = client
        .results
        .get_results::<ListResponse<TestResult>>(&params.code, &query)
        .await
        .into_outcome()?
        .result
        .unwrap_or_else(empty_list)
        .entities;

    let count = |status: &str| results.iter().filter(|r| r.has_status(status)).count();
    let passed = count("passed");
    let statistics = RunStatistics {
        total: results.len(),
        passed,
        failed: count("failed"),
        skipped: count("skipped"),
        blocked: count("blocked"),
        pass_rate: pass_rate(passed, results.len()),
    };

    let failed: Vec<&TestResult> = results.iter().filter(|r| r.has_status("failed")).collect();

    let failure_categories = params.categorize_failures.then(|| {
        let mut categories = Map::new();
        for result in &failed {
            let key = categorize_failure(result.trace()).key();
            let next = categories.get(key).and_then(Value::as_u64).unwrap_or(0) + 1;
            categories.insert(key.to_string(), json!(next));
        }
        categories
    });

    let failures = failed
        .iter()
        .map(|result| FailureSummary {
            hash: result.hash.clone(),
            case_id: result.case_id,
            comment: result.comment.clone(),
            stacktrace: if params.include_stacktraces {
                json!(result.stacktrace)
            } else if result.trace().is_some() {
                json!("Available")
            } else {
                json!("Not available")
            },
            time_spent_ms: result.time_spent_ms,
            end_time: result.end_time.clone(),
            has_attachments: result.attachments.as_ref().is_some_and(|a| !a.is_empty()),
            failed_steps_count: result.failed_steps().count(),
        })
        .collect();

    wrapped(RunAnalysis {
        run_id: params.run_id.as_id(),
        statistics,
        failure_categories,
        failures,
        analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Percentage of passed results with two decimals.
fn pass_rate(passed: usize, total: usize) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", passed as f64 / total as f64 * 100.0)
}

fn empty_list() -> EntityList<TestResult> {
    EntityList {
        total: None,
        filtered: None,
        count: None,
        entities: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use reqwest::{Method, StatusCode};

    fn run_results(transport: &FakeTransport, entities: Value) {
        transport.respond(
            Method::GET,
            "/result/DEMO",
            json!({"status": true, "result": {"total": 10, "filtered": 4, "entities": entities}}),
        );
    }

    #[test]
    fn test_categorize_failure_order() {
        assert_eq!(
            categorize_failure(Some("AssertionError: expected 1 got 2")),
            FailureCategory::Assertion
        );
        // assertion wins over later keywords
        assert_eq!(
            categorize_failure(Some("Assertion failed after Timeout")),
            FailureCategory::Assertion
        );
        assert_eq!(
            categorize_failure(Some("TimeoutError: 30s")),
            FailureCategory::Timeout
        );
        assert_eq!(
            categorize_failure(Some("ECONNREFUSED connection reset")),
            FailureCategory::Network
        );
        assert_eq!(
            categorize_failure(Some("TypeError: cannot read x of undefined")),
            FailureCategory::NullReference
        );
        assert_eq!(
            categorize_failure(Some("segfault")),
            FailureCategory::Other
        );
        assert_eq!(categorize_failure(None), FailureCategory::NoStacktrace);
        assert_eq!(categorize_failure(Some("")), FailureCategory::NoStacktrace);
    }

    #[test]
    fn test_pass_rate_formatting() {
        assert_eq!(pass_rate(0, 0), "0.00");
        assert_eq!(pass_rate(1, 3), "33.33");
        assert_eq!(pass_rate(2, 2), "100.00");
    }

    #[tokio::test]
    async fn test_get_failed_results_reshapes_entities() {
        let transport = FakeTransport::new();
        run_results(
            &transport,
            json!([{
                "hash": "h1", "run_id": 3, "case_id": 7, "status": "failed",
                "comment": "boom", "stacktrace": "AssertionError", "time_spent_ms": 120,
                "end_time": "2024-01-01 10:00:00",
                "attachments": [{"filename": "shot.png", "size": 10, "mime": "image/png", "url": "https://x/shot.png", "hash": "a"}],
                "steps": [{"position": 1, "status": 1}, {"position": 2, "status": 2}]
            }]),
        );

        let params = FailedResultsParams {
            code: "DEMO".into(),
            run_id: Some(RunRef::Text("3".into())),
            limit: None,
            offset: None,
            from_end_time: None,
            to_end_time: None,
        };
        let outcome = get_failed_results(&client(&transport), params).await.unwrap();

        let result = &outcome["result"];
        assert_eq!(result["total"], 10);
        assert_eq!(result["count"], 1);
        let first = &result["failedResults"][0];
        assert_eq!(first["caseId"], 7);
        assert_eq!(first["timeSpentMs"], 120);
        assert_eq!(
            first["attachments"][0],
            json!({"filename": "shot.png", "size": 10, "mime": "image/png", "url": "https://x/shot.png"})
        );
        assert_eq!(
            first["failedSteps"],
            json!([{"position": 2, "status": 2, "attachments": []}])
        );

        let query = &transport.requests()[0].query;
        assert_eq!(query.get("status"), Some("failed"));
        assert_eq!(query.get("run"), Some("3"));
        assert_eq!(query.get("limit"), Some("50"));
        assert_eq!(query.get("offset"), Some("0"));
    }

    #[tokio::test]
    async fn test_detailed_embeds_placeholder_on_lookup_failure() {
        let transport = FakeTransport::new();
        run_results(
            &transport,
            json!([
                {"hash": "h1", "case_id": 7, "status": "failed"},
                {"hash": "h2", "case_id": 8, "status": "failed"}
            ]),
        );
        transport.respond(
            Method::GET,
            "/case/DEMO/7",
            json!({"status": true, "result": {"id": 7, "title": "Login", "suite_id": 2,
                "steps": [{"action": "open"}]}}),
        );
        transport.fail(Method::GET, "/case/DEMO/8", StatusCode::NOT_FOUND, "gone");

        let args = get_failed_results_detailed_schema()
            .validate(&json!({"code": "DEMO", "runId": 3, "includeSteps": true}))
            .unwrap();
        let params: FailedResultsDetailedParams =
            serde_json::from_value(Value::Object(args)).unwrap();
        let outcome = get_failed_results_detailed(&client(&transport), params)
            .await
            .unwrap();

        let detailed = &outcome["result"]["failedResultsDetailed"];
        assert_eq!(outcome["result"]["count"], 2);
        assert_eq!(detailed[0]["hash"], "h1");
        assert_eq!(detailed[0]["testCase"]["title"], "Login");
        assert_eq!(detailed[0]["testCase"]["suite"]["id"], 2);
        assert_eq!(detailed[0]["testCase"]["steps"][0]["action"], "open");
        assert_eq!(
            detailed[1]["testCase"],
            json!({
                "id": 8,
                "title": "Unable to fetch test case details",
                "description": null,
                "error": "Failed to retrieve test case information"
            })
        );
    }

    #[tokio::test]
    async fn test_detailed_omits_steps_unless_requested() {
        let transport = FakeTransport::new();
        run_results(&transport, json!([{"hash": "h1", "case_id": 7, "status": "failed"}]));
        transport.respond(
            Method::GET,
            "/case/DEMO/7",
            json!({"status": true, "result": {"id": 7, "steps": [{"action": "open"}]}}),
        );

        let args = get_failed_results_detailed_schema()
            .validate(&json!({"code": "DEMO"}))
            .unwrap();
        let params: FailedResultsDetailedParams =
            serde_json::from_value(Value::Object(args)).unwrap();
        let outcome = get_failed_results_detailed(&client(&transport), params)
            .await
            .unwrap();

        let test_case = outcome["result"]["failedResultsDetailed"][0]["testCase"]
            .as_object()
            .unwrap()
            .clone();
        assert!(!test_case.contains_key("steps"));
        assert_eq!(test_case["suite"], Value::Null);
    }

    #[tokio::test]
    async fn test_analyze_run_failures_statistics_and_categories() {
        let transport = FakeTransport::new();
        run_results(
            &transport,
            json!([
                {"hash": "p1", "case_id": 1, "status": "passed"},
                {"hash": "f1", "case_id": 2, "status": "failed", "stacktrace": "AssertionError: x",
                    "attachments": [{"filename": "log.txt"}], "steps": [{"position": 1, "status": 2}]},
                {"hash": "f2", "case_id": 3, "status": "failed", "stacktrace": "Read timeout"},
                {"hash": "f3", "case_id": 4, "status": "failed"},
                {"hash": "s1", "case_id": 5, "status": "skipped"}
            ]),
        );

        let args = analyze_run_failures_schema()
            .validate(&json!({"code": "DEMO", "runId": "9", "categorizeFailures": true}))
            .unwrap();
        let params: AnalyzeRunParams = serde_json::from_value(Value::Object(args)).unwrap();
        let outcome = analyze_run_failures(&client(&transport), params)
            .await
            .unwrap();

        let analysis = &outcome["result"];
        assert_eq!(analysis["runId"], 9);
        assert_eq!(
            analysis["statistics"],
            json!({"total": 5, "passed": 1, "failed": 3, "skipped": 1, "blocked": 0, "passRate": "20.00"})
        );
        assert_eq!(
            analysis["failureCategories"],
            json!({"assertionErrors": 1, "timeoutErrors": 1, "noStacktraceErrors": 1})
        );

        let first = &analysis["failures"][0];
        assert_eq!(first["stacktrace"], "Available");
        assert_eq!(first["hasAttachments"], true);
        assert_eq!(first["failedStepsCount"], 1);
        assert_eq!(analysis["failures"][2]["stacktrace"], "Not available");
        assert!(analysis["analysisTimestamp"].as_str().unwrap().ends_with('Z'));

        let query = &transport.requests()[0].query;
        assert_eq!(query.get("run"), Some("9"));
        assert_eq!(query.get("limit"), Some("100"));
        assert_eq!(query.get("status"), None);
    }

    #[tokio::test]
    async fn test_analyze_without_categories_omits_key() {
        let transport = FakeTransport::new();
        run_results(
            &transport,
            json!([{"hash": "f1", "case_id": 2, "status": "failed", "stacktrace": "boom"}]),
        );

        let params = AnalyzeRunParams {
            code: "DEMO".into(),
            run_id: RunRef::Id(4),
            include_stacktraces: true,
            categorize_failures: false,
        };
        let outcome = analyze_run_failures(&client(&transport), params)
            .await
            .unwrap();

        let analysis = outcome["result"].as_object().unwrap();
        assert!(!analysis.contains_key("failureCategories"));
        assert_eq!(analysis["failures"][0]["stacktrace"], "boom");
        assert_eq!(analysis["statistics"]["passRate"], "0.00");
    }

    #[tokio::test]
    async fn test_analyze_forwards_lookup_error() {
        let transport = FakeTransport::new();
        transport.fail(Method::GET, "/result/DEMO", StatusCode::UNAUTHORIZED, "bad token");

        let params = AnalyzeRunParams {
            code: "DEMO".into(),
            run_id: RunRef::Id(4),
            include_stacktraces: false,
            categorize_failures: false,
        };
        let err = analyze_run_failures(&client(&transport), params)
            .await
            .unwrap_err();
        assert!(err.message().contains("bad token"));
    }
}
