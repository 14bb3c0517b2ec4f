//! Test case tools, including the parameter merge on update.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{code_field, limit_field, offset_field, payload, string_list};
use crate::api::cases::{
    CaseCreate, CaseStep, CaseUpdate, CasesQuery, CustomFieldValue, TestCase,
};
use crate::api::{QaseClient, QaseResponse, RawResponse};
use crate::envelope::{IntoOutcome, Outcome};
use crate::schema::{Field, FieldType, ToolSchema};

/// External trackers Qase can link cases to.
pub const EXTERNAL_ISSUE_TYPES: &[&str] = &[
    "asana",
    "azure-devops",
    "clickup-app",
    "github-app",
    "gitlab-app",
    "jira-cloud",
    "jira-server",
    "linear",
    "monday",
    "redmine-app",
    "trello-app",
    "youtrack-app",
];

fn step_type(create: bool) -> FieldType {
    let mut fields = vec![
        Field::string("action"),
        Field::string("expected_result").optional(),
        Field::string("data").optional(),
    ];
    if create {
        fields.push(Field::string("shared_step_hash").optional());
        fields.push(Field::string("shared_step_nested_hash").optional());
    } else {
        fields.push(Field::integer("position").optional());
    }
    FieldType::Object(fields)
}

/// Fields shared by create, bulk create and update. Only `title` differs in
/// optionality.
fn case_fields(title_required: bool, create_steps: bool) -> Vec<Field> {
    let title = if title_required {
        Field::string("title")
    } else {
        Field::string("title").optional()
    };
    vec![
        title,
        Field::string("description").optional(),
        Field::string("preconditions").optional(),
        Field::string("postconditions").optional(),
        Field::integer("severity").optional(),
        Field::integer("priority").optional(),
        Field::integer("type").optional(),
        Field::integer("behavior").optional(),
        Field::integer("automation").optional(),
        Field::integer("status").optional(),
        Field::integer("suite_id").optional(),
        Field::integer("milestone_id").optional(),
        Field::integer("layer").optional(),
        Field::boolean("is_flaky").optional(),
        Field::record("params", FieldType::Array(Box::new(FieldType::String)))
            .optional()
            .describe("Parameter name to list of values"),
        string_list("tags").optional(),
        Field::array("steps", step_type(create_steps)).optional(),
        Field::array(
            "custom_fields",
            FieldType::Object(vec![Field::integer("id"), Field::string("value")]),
        )
        .optional(),
    ]
}

pub fn get_cases_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::string("search").optional(),
        Field::integer("milestoneId").optional(),
        Field::integer("suiteId").optional(),
        Field::string("severity").optional(),
        Field::string("priority").optional(),
        Field::string("type").optional(),
        Field::string("behavior").optional(),
        Field::string("automation").optional(),
        Field::string("status").optional(),
        Field::string("externalIssuesType")
            .one_of(EXTERNAL_ISSUE_TYPES)
            .optional(),
        string_list("externalIssuesIds").optional(),
        Field::string("include").optional(),
        limit_field(),
        offset_field(),
    ])
}

pub fn get_case_schema() -> ToolSchema {
    ToolSchema::new(vec![code_field(), Field::integer("id")])
}

pub fn create_case_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::object("testCase", case_fields(true, true)),
    ])
}

pub fn create_case_bulk_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::array("cases", FieldType::Object(case_fields(true, false))),
    ])
}

pub fn update_case_schema() -> ToolSchema {
    let mut fields = vec![code_field(), Field::integer("id")];
    fields.extend(case_fields(false, false));
    ToolSchema::new(fields)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCasesParams {
    pub code: String,
    pub search: Option<String>,
    pub milestone_id: Option<u64>,
    pub suite_id: Option<u64>,
    pub severity: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub case_type: Option<String>,
    pub behavior: Option<String>,
    pub automation: Option<String>,
    pub status: Option<String>,
    pub external_issues_type: Option<String>,
    pub external_issues_ids: Option<Vec<String>>,
    pub include: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetCaseParams {
    pub code: String,
    pub id: u64,
}

/// Case attributes as tools accept them.
#[derive(Debug, Default, Deserialize)]
pub struct CaseFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub preconditions: Option<String>,
    pub postconditions: Option<String>,
    pub severity: Option<i64>,
    pub priority: Option<i64>,
    #[serde(rename = "type")]
    pub case_type: Option<i64>,
    pub behavior: Option<i64>,
    pub automation: Option<i64>,
    pub status: Option<i64>,
    pub suite_id: Option<u64>,
    pub milestone_id: Option<u64>,
    pub layer: Option<i64>,
    pub is_flaky: Option<bool>,
    pub params: Option<Map<String, Value>>,
    pub tags: Option<Vec<String>>,
    pub steps: Option<Vec<CaseStep>>,
    pub custom_fields: Option<Vec<CustomFieldValue>>,
}

/// Qase stores the flaky flag as 1/0. Absent stays absent.
fn flaky_flag(flag: Option<bool>) -> Option<u8> {
    flag.map(u8::from)
}

impl CaseFields {
    pub fn into_create(self) -> CaseCreate {
        CaseCreate {
            title: self.title.unwrap_or_default(),
            description: self.description,
            preconditions: self.preconditions,
            postconditions: self.postconditions,
            severity: self.severity,
            priority: self.priority,
            case_type: self.case_type,
            behavior: self.behavior,
            automation: self.automation,
            status: self.status,
            suite_id: self.suite_id,
            milestone_id: self.milestone_id,
            layer: self.layer,
            is_flaky: flaky_flag(self.is_flaky),
            params: self.params.map(Value::Object),
            tags: self.tags,
            steps: self.steps,
            custom_fields: self.custom_fields,
        }
    }

    pub fn into_update(self) -> CaseUpdate {
        CaseUpdate {
            title: self.title,
            description: self.description,
            preconditions: self.preconditions,
            postconditions: self.postconditions,
            severity: self.severity,
            priority: self.priority,
            case_type: self.case_type,
            behavior: self.behavior,
            automation: self.automation,
            status: self.status,
            suite_id: self.suite_id,
            milestone_id: self.milestone_id,
            layer: self.layer,
            is_flaky: flaky_flag(self.is_flaky),
            params: self.params,
            tags: self.tags,
            steps: self.steps,
            custom_fields: self.custom_fields,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCaseParams {
    pub code: String,
    #[serde(rename = "testCase")]
    pub test_case: CaseFields,
}

#[derive(Debug, Deserialize)]
pub struct CreateCaseBulkParams {
    pub code: String,
    pub cases: Vec<CaseFields>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaseParams {
    pub code: String,
    pub id: u64,
    #[serde(flatten)]
    pub fields: CaseFields,
}

pub async fn get_cases(client: &QaseClient, params: GetCasesParams) -> Outcome<Value> {
    let query = CasesQuery {
        search: params.search,
        milestone_id: params.milestone_id,
        suite_id: params.suite_id,
        severity: params.severity,
        priority: params.priority,
        case_type: params.case_type,
        behavior: params.behavior,
        automation: params.automation,
        status: params.status,
        external_issues_type: params.external_issues_type,
        external_issues_ids: params.external_issues_ids.unwrap_or_default(),
        include: params.include,
        limit: params.limit,
        offset: params.offset,
    };
    payload(client.cases.get_cases(&params.code, &query).await)
}

pub async fn get_case(client: &QaseClient, params: GetCaseParams) -> Outcome<Value> {
    payload(client.cases.get_case::<RawResponse>(&params.code, params.id).await)
}

pub async fn create_case(client: &QaseClient, params: CreateCaseParams) -> Outcome<Value> {
    let request = params.test_case.into_create();
    payload(client.cases.create_case(&params.code, &request).await)
}

pub async fn create_case_bulk(client: &QaseClient, params: CreateCaseBulkParams) -> Outcome<Value> {
    let cases: Vec<CaseCreate> = params
        .cases
        .into_iter()
        .map(CaseFields::into_create)
        .collect();
    payload(client.cases.create_case_bulk(&params.code, &cases).await)
}

/// Update a case. A supplied parameter map is merged over the case's
/// current parameters, so keys the caller leaves out survive.
pub async fn update_case(client: &QaseClient, params: UpdateCaseParams) -> Outcome<Value> {
    let UpdateCaseParams { code, id, fields } = params;
    let mut update = fields.into_update();

    if let Some(incoming) = update.params.take() {
        let existing: QaseResponse<TestCase> =
            client.cases.get_case(&code, id).await.into_outcome()?;
        let current = existing
            .result
            .map(|case| case.param_map())
            .unwrap_or_default();
        update.params = Some(merge_params(current, incoming));
    }

    payload(client.cases.update_case(&code, id, &update).await)
}

/// Overlay `incoming` on `existing` key by key; incoming values win.
pub fn merge_params(
    mut existing: Map<String, Value>,
    incoming: Map<String, Value>,
) -> Map<String, Value> {
    for (key, values) in incoming {
        existing.insert(key, values);
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    fn parse_update(args: Value) -> UpdateCaseParams {
        let normalized = update_case_schema().validate(&args).unwrap();
        serde_json::from_value(Value::Object(normalized)).unwrap()
    }

    #[tokio::test]
    async fn test_update_merges_params_with_existing_case() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/case/DEMO/42",
            json!({"status": true, "result": {"id": 42, "params": {"os": ["linux"]}}}),
        );
        transport.respond(
            Method::PATCH,
            "/case/DEMO/42",
            json!({"status": true, "result": {"id": 42}}),
        );

        let params = parse_update(json!({
            "code": "DEMO",
            "id": 42,
            "params": {"browser": ["chrome"]}
        }));
        update_case(&client(&transport), params).await.unwrap();

        let patch = &transport.requests_to(Method::PATCH, "/case/DEMO/42")[0];
        assert_eq!(
            patch.body,
            Some(json!({"params": {"os": ["linux"], "browser": ["chrome"]}}))
        );
    }

    #[tokio::test]
    async fn test_update_without_params_skips_lookup() {
        let transport = FakeTransport::new();
        transport.respond(Method::PATCH, "/case/DEMO/42", json!({"status": true}));

        let params = parse_update(json!({"code": "DEMO", "id": 42, "title": "Renamed"}));
        update_case(&client(&transport), params).await.unwrap();

        assert!(transport.requests_to(Method::GET, "/case/DEMO/42").is_empty());
        let patch = &transport.requests_to(Method::PATCH, "/case/DEMO/42")[0];
        assert_eq!(patch.body, Some(json!({"title": "Renamed"})));
    }

    #[tokio::test]
    async fn test_update_encodes_flaky_flag_as_integer() {
        let transport = FakeTransport::new();
        transport.respond(Method::PATCH, "/case/DEMO/1", json!({"status": true}));

        let params = parse_update(json!({"code": "DEMO", "id": 1, "is_flaky": false}));
        update_case(&client(&transport), params).await.unwrap();

        let patch = &transport.requests()[0];
        assert_eq!(patch.body, Some(json!({"is_flaky": 0})));
    }

    #[tokio::test]
    async fn test_update_tolerates_case_without_params() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/case/DEMO/5",
            json!({"status": true, "result": {"id": 5, "params": []}}),
        );
        transport.respond(Method::PATCH, "/case/DEMO/5", json!({"status": true}));

        let params = parse_update(json!({"code": "DEMO", "id": 5, "params": {"env": ["qa"]}}));
        update_case(&client(&transport), params).await.unwrap();

        let patch = &transport.requests_to(Method::PATCH, "/case/DEMO/5")[0];
        assert_eq!(patch.body, Some(json!({"params": {"env": ["qa"]}})));
    }

    #[tokio::test]
    async fn test_update_stops_when_lookup_fails() {
        let transport = FakeTransport::new();
        transport.fail(Method::GET, "/case/DEMO/9", StatusCode::NOT_FOUND, "Case not found");

        let params = parse_update(json!({"code": "DEMO", "id": 9, "params": {"a": ["b"]}}));
        let err = update_case(&client(&transport), params).await.unwrap_err();

        assert!(err.message().contains("Case not found"));
        assert!(transport.requests_to(Method::PATCH, "/case/DEMO/9").is_empty());
    }

    #[test]
    fn test_merge_params_keeps_untouched_keys() {
        let existing = json!({"os": ["linux"], "browser": ["firefox"]});
        let incoming = json!({"browser": ["chrome"]});
        let merged = merge_params(
            existing.as_object().unwrap().clone(),
            incoming.as_object().unwrap().clone(),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"os": ["linux"], "browser": ["chrome"]})
        );
    }

    #[tokio::test]
    async fn test_get_cases_maps_camel_case_filters() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/case/DEMO",
            json!({"status": true, "result": {"total": 0, "entities": []}}),
        );

        let args = get_cases_schema()
            .validate(&json!({"code": "DEMO", "suiteId": 3, "type": "smoke", "limit": 5}))
            .unwrap();
        let params: GetCasesParams = serde_json::from_value(Value::Object(args)).unwrap();
        get_cases(&client(&transport), params).await.unwrap();

        let query = &transport.requests()[0].query;
        assert_eq!(query.get("suite_id"), Some("3"));
        assert_eq!(query.get("type"), Some("smoke"));
        assert_eq!(query.get("limit"), Some("5"));
    }

    #[tokio::test]
    async fn test_create_case_converts_nested_fields() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::POST,
            "/case/DEMO",
            json!({"status": true, "result": {"id": 10}}),
        );

        let args = create_case_schema()
            .validate(&json!({
                "code": "DEMO",
                "testCase": {
                    "title": "Checkout",
                    "is_flaky": true,
                    "steps": [{"action": "Open cart", "expected_result": "Cart shown"}]
                }
            }))
            .unwrap();
        let params: CreateCaseParams = serde_json::from_value(Value::Object(args)).unwrap();
        create_case(&client(&transport), params).await.unwrap();

        assert_eq!(
            transport.requests()[0].body,
            Some(json!({
                "title": "Checkout",
                "is_flaky": 1,
                "steps": [{"action": "Open cart", "expected_result": "Cart shown"}]
            }))
        );
    }

    #[test]
    fn test_bulk_schema_requires_title_per_case() {
        let errors = create_case_bulk_schema()
            .validate(&json!({"code": "DEMO", "cases": [{"title": "a"}, {"severity": 2}]}))
            .unwrap_err();
        assert_eq!(errors.fields()[0].path, "cases[1].title");
    }
}
