//! Test Cases API client.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{to_body, Endpoint, Extra, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// Test case entity.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TestCase {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub suite_id: Option<u64>,
    pub milestone_id: Option<u64>,
    pub severity: Option<i64>,
    pub priority: Option<i64>,
    #[serde(rename = "type")]
    pub case_type: Option<i64>,
    pub behavior: Option<i64>,
    pub automation: Option<i64>,
    pub status: Option<i64>,
    /// Parameter name to list of values. Qase sends `[]` when a case has none.
    pub params: Option<Value>,
    pub steps: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl TestCase {
    /// The case's parameter map, or an empty map when it has none.
    pub fn param_map(&self) -> Map<String, Value> {
        match &self.params {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }
}

/// One step of a test case.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CaseStep {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_step_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_step_nested_hash: Option<String>,
}

/// Custom field value attached to a case.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CustomFieldValue {
    pub id: i64,
    pub value: String,
}

/// Request to create a test case. Also used per item in bulk creation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CaseCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postconditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub case_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<i64>,
    /// Qase expects 1/0 rather than a boolean.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_flaky: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<CaseStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<CustomFieldValue>>,
}

/// Request to update a test case. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CaseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postconditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub case_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_flaky: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<CaseStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<CustomFieldValue>>,
}

/// Links between cases and issues in an external tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalIssueAttach {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub links: Vec<ExternalIssueLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalIssueLink {
    pub case_id: u64,
    pub external_issues: Vec<String>,
}

/// Filters for listing cases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasesQuery {
    pub search: Option<String>,
    pub milestone_id: Option<u64>,
    pub suite_id: Option<u64>,
    pub severity: Option<String>,
    pub priority: Option<String>,
    pub case_type: Option<String>,
    pub behavior: Option<String>,
    pub automation: Option<String>,
    pub status: Option<String>,
    pub external_issues_type: Option<String>,
    pub external_issues_ids: Vec<String>,
    pub include: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl CasesQuery {
    fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("search", self.search.as_deref())
            .opt("milestone_id", self.milestone_id)
            .opt("suite_id", self.suite_id)
            .opt("severity", self.severity.as_deref())
            .opt("priority", self.priority.as_deref())
            .opt("type", self.case_type.as_deref())
            .opt("behavior", self.behavior.as_deref())
            .opt("automation", self.automation.as_deref())
            .opt("status", self.status.as_deref())
            .opt("external_issues[type]", self.external_issues_type.as_deref())
            .each("external_issues[ids][]", &self.external_issues_ids)
            .opt("include", self.include.as_deref())
            .opt("limit", self.limit)
            .opt("offset", self.offset)
    }
}

/// Test Cases API client.
#[derive(Clone)]
pub struct CasesClient {
    endpoint: Endpoint,
}

impl CasesClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// List cases in a project.
    pub async fn get_cases(
        &self,
        code: &str,
        query: &CasesQuery,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/case/{}", code)).with_query(query.to_query()))
            .await
    }

    /// Get a single case by ID, decoded as `R`: `QaseResponse<TestCase>` to
    /// inspect it, [`RawResponse`] to forward it.
    pub async fn get_case<R: DeserializeOwned>(
        &self,
        code: &str,
        id: u64,
    ) -> Result<R, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/case/{}/{}", code, id)))
            .await
    }

    /// Create a case. The result carries the new case ID.
    pub async fn create_case(
        &self,
        code: &str,
        request: &CaseCreate,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(format!("/case/{}", code), to_body(request)?))
            .await
    }

    /// Create several cases in one request.
    pub async fn create_case_bulk(
        &self,
        code: &str,
        cases: &[CaseCreate],
    ) -> Result<RawResponse, ApiError> {
        let body = serde_json::json!({ "cases": to_body(&cases)? });
        self.endpoint
            .call(ApiRequest::post(format!("/case/{}/bulk", code), body))
            .await
    }

    /// Update an existing case.
    pub async fn update_case(
        &self,
        code: &str,
        id: u64,
        request: &CaseUpdate,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/case/{}/{}", code, id),
                to_body(request)?,
            ))
            .await
    }

    /// Attach external tracker issues to cases.
    pub async fn attach_external_issue(
        &self,
        code: &str,
        request: &ExternalIssueAttach,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(
                format!("/case/{}/external-issue/attach", code),
                to_body(request)?,
            ))
            .await
    }
}

impl std::fmt::Debug for CasesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasesClient").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_keeps_unknown_fields_and_nulls() {
        let raw = json!({
            "id": 42,
            "title": "Login works",
            "description": null,
            "milestone_id": null,
            "params": {"os": ["linux"]},
            "is_flaky": 0,
            "external_issues": [{"type": "jira-cloud", "issues": [{"id": "PROJ-1"}]}]
        });

        let case: TestCase = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(case.id, Some(42));
        assert_eq!(case.param_map()["os"], json!(["linux"]));

        let back = serde_json::to_value(&case).unwrap();
        for (key, value) in raw.as_object().unwrap() {
            assert_eq!(&back[key], value, "{key}");
        }
        assert!(back.as_object().unwrap().contains_key("description"));
    }

    #[test]
    fn test_param_map_tolerates_empty_array() {
        let case: TestCase = serde_json::from_value(json!({"id": 1, "params": []})).unwrap();
        assert!(case.param_map().is_empty());
    }

    #[test]
    fn test_cases_query_external_issue_filters() {
        let query = CasesQuery {
            external_issues_type: Some("jira-cloud".into()),
            external_issues_ids: vec!["PROJ-7".into()],
            limit: Some(10),
            ..Default::default()
        }
        .to_query();

        assert_eq!(query.get("external_issues[type]"), Some("jira-cloud"));
        assert_eq!(query.get("external_issues[ids][]"), Some("PROJ-7"));
        assert_eq!(query.get("limit"), Some("10"));
        assert_eq!(query.get("search"), None);
    }

    #[test]
    fn test_update_omits_absent_fields() {
        let update = CaseUpdate {
            title: Some("New".into()),
            is_flaky: Some(1),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"title": "New", "is_flaky": 1})
        );
    }
}
