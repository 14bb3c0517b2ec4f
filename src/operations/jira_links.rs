//! Links between test cases and Jira issues.

use serde::Deserialize;
use serde_json::Value;

use super::{code_field, limit_field, offset_field, payload};
use crate::api::cases::{CasesQuery, ExternalIssueAttach, ExternalIssueLink};
use crate::api::QaseClient;
use crate::envelope::{IntoOutcome, Outcome};
use crate::schema::{Field, ToolSchema};

pub const JIRA_TYPES: &[&str] = &["jira-cloud", "jira-server"];

pub const LINK_TYPES: &[&str] = &["related", "blocks", "is_blocked_by", "tests", "is_tested_by"];

fn jira_type_field() -> Field {
    Field::string("jiraType")
        .one_of(JIRA_TYPES)
        .default(Value::String("jira-cloud".into()))
        .describe("Jira integration type")
}

fn issue_key_field() -> Field {
    Field::string("jiraIssueKey")
        .range(1, 255)
        .describe("Jira issue key (e.g., PROJ-123)")
}

pub fn link_test_case_to_jira_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        Field::integer("caseId").describe("Qase test case ID"),
        issue_key_field(),
        jira_type_field(),
        Field::string("linkType")
            .one_of(LINK_TYPES)
            .default(Value::String("related".into()))
            .describe("Relationship recorded for the link"),
    ])
}

pub fn get_test_cases_linked_to_jira_schema() -> ToolSchema {
    ToolSchema::new(vec![
        code_field(),
        issue_key_field(),
        jira_type_field(),
        limit_field(),
        offset_field(),
    ])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTestCaseParams {
    pub code: String,
    pub case_id: u64,
    pub jira_issue_key: String,
    pub jira_type: String,
    pub link_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedCasesParams {
    pub code: String,
    pub jira_issue_key: String,
    pub jira_type: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Attach a Jira issue to a case and return Qase's response. Qase records
/// no relationship kind, so `linkType` is accepted but not sent.
pub async fn link_test_case_to_jira(
    client: &QaseClient,
    params: LinkTestCaseParams,
) -> Outcome<Value> {
    let request = ExternalIssueAttach {
        issue_type: params.jira_type.clone(),
        links: vec![ExternalIssueLink {
            case_id: params.case_id,
            external_issues: vec![params.jira_issue_key.clone()],
        }],
    };
    let response = client
        .cases
        .attach_external_issue(&params.code, &request)
        .await
        .into_outcome()?;

    tracing::debug!(
        case_id = params.case_id,
        issue = %params.jira_issue_key,
        link_type = %params.link_type,
        "linked case to jira issue"
    );

    Ok(response)
}

pub async fn get_test_cases_linked_to_jira(
    client: &QaseClient,
    params: LinkedCasesParams,
) -> Outcome<Value> {
    let query = CasesQuery {
        external_issues_type: Some(params.jira_type),
        external_issues_ids: vec![params.jira_issue_key],
        limit: params.limit,
        offset: params.offset,
        ..Default::default()
    };
    payload(client.cases.get_cases(&params.code, &query).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    fn link_params(args: Value) -> LinkTestCaseParams {
        let normalized = link_test_case_to_jira_schema().validate(&args).unwrap();
        serde_json::from_value(Value::Object(normalized)).unwrap()
    }

    #[tokio::test]
    async fn test_link_defaults_to_jira_cloud() {
        let transport = FakeTransport::new();
        let upstream = json!({
            "status": true,
            "result": {"id": 42, "external_issues": [{"id": "PROJ-1", "link": null}]}
        });
        transport.respond(
            Method::POST,
            "/case/DEMO/external-issue/attach",
            upstream.clone(),
        );

        let params = link_params(json!({"code": "DEMO", "caseId": 42, "jiraIssueKey": "PROJ-1"}));
        let outcome = link_test_case_to_jira(&client(&transport), params)
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].body,
            Some(json!({
                "type": "jira-cloud",
                "links": [{"case_id": 42, "external_issues": ["PROJ-1"]}]
            }))
        );
        assert_eq!(outcome, upstream);
    }

    #[tokio::test]
    async fn test_link_type_is_not_sent_upstream() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::POST,
            "/case/DEMO/external-issue/attach",
            json!({"status": true}),
        );

        let params = link_params(json!({
            "code": "DEMO", "caseId": 7, "jiraIssueKey": "PROJ-3", "linkType": "blocks"
        }));
        let outcome = link_test_case_to_jira(&client(&transport), params)
            .await
            .unwrap();

        assert_eq!(outcome, json!({"status": true}));
        let body = transport.requests()[0].body.clone().unwrap();
        assert!(body.get("linkType").is_none());
        assert!(body.get("link_type").is_none());
    }

    #[tokio::test]
    async fn test_link_failure_is_reported() {
        let transport = FakeTransport::new();
        transport.fail(
            Method::POST,
            "/case/DEMO/external-issue/attach",
            StatusCode::BAD_REQUEST,
            "Integration is not configured",
        );

        let params = link_params(json!({
            "code": "DEMO", "caseId": 1, "jiraIssueKey": "PROJ-2", "jiraType": "jira-server"
        }));
        let err = link_test_case_to_jira(&client(&transport), params)
            .await
            .unwrap_err();
        assert!(err.message().contains("Integration is not configured"));
    }

    #[test]
    fn test_link_rejects_unknown_jira_type() {
        let errors = link_test_case_to_jira_schema()
            .validate(&json!({
                "code": "DEMO", "caseId": 1, "jiraIssueKey": "PROJ-2", "jiraType": "jira-dc"
            }))
            .unwrap_err();
        assert_eq!(errors.fields()[0].path, "jiraType");
    }

    #[tokio::test]
    async fn test_linked_cases_filters_by_issue() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/case/DEMO",
            json!({"status": true, "result": {"total": 1, "entities": [{"id": 42}]}}),
        );

        let args = get_test_cases_linked_to_jira_schema()
            .validate(&json!({"code": "DEMO", "jiraIssueKey": "PROJ-1", "limit": 10}))
            .unwrap();
        let params: LinkedCasesParams = serde_json::from_value(Value::Object(args)).unwrap();
        let outcome = get_test_cases_linked_to_jira(&client(&transport), params)
            .await
            .unwrap();

        assert_eq!(outcome["result"]["entities"][0]["id"], 42);
        let query = &transport.requests()[0].query;
        assert_eq!(query.get("external_issues[type]"), Some("jira-cloud"));
        assert_eq!(query.get("external_issues[ids][]"), Some("PROJ-1"));
        assert_eq!(query.get("limit"), Some("10"));
    }
}
