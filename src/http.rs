//! HTTP transport for the Qase REST API.
//!
//! [`Transport`] is the seam between the typed API clients and the wire:
//! production code uses [`ReqwestTransport`], tests substitute an in-memory
//! implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Query string builder. Absent values are skipped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a parameter if a value is present.
    pub fn opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    /// Repeat a parameter once per value (`key=a&key=b`).
    pub fn each<V: fmt::Display>(mut self, key: &str, values: &[V]) -> Self {
        for value in values {
            self = self.set(key, value);
        }
        self
    }

    /// Look up the first value for a key.
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Build query string for URL.
    pub fn to_query_string(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let params: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        format!("?{}", params.join("&"))
    }
}

/// One request against the Qase API, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParams,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Sends requests and returns the decoded JSON response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// Qase error envelope: `{"status": false, "errorMessage": ..., "errorFields": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QaseErrorBody {
    error_message: Option<String>,
    message: Option<String>,
    #[serde(default)]
    error_fields: Vec<QaseErrorField>,
}

#[derive(Debug, Deserialize)]
struct QaseErrorField {
    field: Option<String>,
    error: Option<String>,
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    base_url: String,
    token: String,
    http_client: Client,
}

impl ReqwestTransport {
    /// Create a new transport.
    ///
    /// # Errors
    /// Returns `ApiError::HttpClientInit` if the HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ApiError::HttpClientInit(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http_client,
        })
    }

    fn url(&self, request: &ApiRequest) -> String {
        format!(
            "{}{}{}",
            self.base_url,
            request.path,
            request.query.to_query_string()
        )
    }

    /// Handle HTTP response and parse JSON.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            tracing::debug!(status = status.as_u16(), body = %truncate(&body, 500), "Qase API response");
            if body.trim().is_empty() {
                return Ok(json!({ "status": true }));
            }
            Ok(serde_json::from_str(&body)?)
        } else {
            tracing::debug!(status = status.as_u16(), body = %body, "Qase API error response");
            Err(parse_error_response(status, &body))
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url(&request);
        tracing::debug!(method = %request.method, url = %url, "Qase API request");

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header("Token", &self.token)
            .header("Accept", "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        self.handle_response(response).await
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Parse error response.
fn parse_error_response(status: StatusCode, body: &str) -> ApiError {
    let Ok(error) = serde_json::from_str::<QaseErrorBody>(body) else {
        return ApiError::HttpError {
            status,
            body: body.to_string(),
        };
    };

    let Some(mut message) = error.error_message.or(error.message) else {
        return ApiError::HttpError {
            status,
            body: body.to_string(),
        };
    };

    let fields: Vec<String> = error
        .error_fields
        .iter()
        .map(|f| {
            format!(
                "{}: {}",
                f.field.as_deref().unwrap_or("?"),
                f.error.as_deref().unwrap_or("invalid")
            )
        })
        .collect();
    if !fields.is_empty() {
        message = format!("{} ({})", message, fields.join(", "));
    }

    ApiError::Qase { status, message }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &s[..end])
}
