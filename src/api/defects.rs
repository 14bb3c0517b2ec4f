//! Defects API client.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{double_option, to_body, Endpoint, Extra, RawResponse};
use crate::error::ApiError;
use crate::http::{ApiRequest, QueryParams};

/// Defect entity.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defect {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub actual_result: Option<String>,
    pub severity: Option<Value>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Request to create a defect.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DefectCreate {
    pub title: String,
    pub actual_result: String,
    pub severity: i64,
    /// `Some(None)` detaches the milestone explicitly.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub milestone_id: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Request to update a defect. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DefectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<i64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub milestone_id: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Defects API client.
#[derive(Clone)]
pub struct DefectsClient {
    endpoint: Endpoint,
}

impl DefectsClient {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub async fn get_defects(
        &self,
        code: &str,
        status: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<RawResponse, ApiError> {
        let query = QueryParams::new()
            .opt("status", status)
            .opt("limit", limit)
            .opt("offset", offset);
        self.endpoint
            .call(ApiRequest::get(format!("/defect/{}", code)).with_query(query))
            .await
    }

    /// Get a defect, decoded as `QaseResponse<Defect>` or [`RawResponse`].
    pub async fn get_defect<R: DeserializeOwned>(
        &self,
        code: &str,
        id: u64,
    ) -> Result<R, ApiError> {
        self.endpoint
            .call(ApiRequest::get(format!("/defect/{}/{}", code, id)))
            .await
    }

    pub async fn create_defect(
        &self,
        code: &str,
        request: &DefectCreate,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::post(format!("/defect/{}", code), to_body(request)?))
            .await
    }

    pub async fn update_defect(
        &self,
        code: &str,
        id: u64,
        request: &DefectUpdate,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/defect/{}/{}", code, id),
                to_body(request)?,
            ))
            .await
    }

    pub async fn delete_defect(&self, code: &str, id: u64) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::delete(format!("/defect/{}/{}", code, id)))
            .await
    }

    pub async fn resolve_defect(&self, code: &str, id: u64) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/defect/{}/resolve/{}", code, id),
                json!({}),
            ))
            .await
    }

    pub async fn update_defect_status(
        &self,
        code: &str,
        id: u64,
        status: &str,
    ) -> Result<RawResponse, ApiError> {
        self.endpoint
            .call(ApiRequest::patch(
                format!("/defect/{}/status/{}", code, id),
                json!({ "status": status }),
            ))
            .await
    }
}

impl std::fmt::Debug for DefectsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefectsClient").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestone_null_is_kept_distinct_from_absent() {
        let detach: DefectUpdate = serde_json::from_value(json!({"milestone_id": null})).unwrap();
        assert_eq!(detach.milestone_id, Some(None));
        assert_eq!(
            serde_json::to_value(&detach).unwrap(),
            json!({"milestone_id": null})
        );

        let untouched: DefectUpdate = serde_json::from_value(json!({"title": "t"})).unwrap();
        assert_eq!(untouched.milestone_id, None);
        assert_eq!(serde_json::to_value(&untouched).unwrap(), json!({"title": "t"}));
    }
}
