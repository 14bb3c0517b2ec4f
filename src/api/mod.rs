//! Qase REST API clients.
//!
//! [`QaseClient`] is the single long-lived handle built at startup. It holds
//! one sub-client per entity, all sharing the same [`Transport`].

pub mod cases;
pub mod defects;
pub mod plans;
pub mod projects;
pub mod results;
pub mod runs;
pub mod search;
pub mod shared_steps;
pub mod suites;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::http::{ApiRequest, Transport};

// Re-export commonly used types
pub use cases::CasesClient;
pub use defects::DefectsClient;
pub use plans::PlansClient;
pub use projects::ProjectsClient;
pub use results::ResultsClient;
pub use runs::RunsClient;
pub use search::SearchClient;
pub use shared_steps::SharedStepsClient;
pub use suites::SuitesClient;

/// Standard Qase response envelope: `{"status": true, "result": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QaseResponse<T> {
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

fn default_status() -> bool {
    true
}

impl<T> QaseResponse<T> {
    /// Wrap a locally computed payload in the upstream envelope shape.
    pub fn ok(result: T) -> Self {
        Self {
            status: true,
            result: Some(result),
        }
    }
}

/// Paged list payload.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct EntityList<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default)]
    pub entities: Vec<T>,
}

/// Paged list response.
pub type ListResponse<T> = QaseResponse<EntityList<T>>;

/// Upstream body for endpoints whose payload this crate never inspects.
/// Kept undecoded so every field, explicit nulls included, reaches the caller.
pub type RawResponse = Value;

/// Shared plumbing for the entity clients.
#[derive(Clone)]
pub(crate) struct Endpoint {
    transport: Arc<dyn Transport>,
}

impl Endpoint {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send a request and decode the response body.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let body = self.transport.send(request).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Serialize a request body.
pub(crate) fn to_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(body)?)
}

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Upstream fields this crate does not name explicitly.
pub type Extra = Map<String, Value>;

/// Container for all Qase API clients.
#[derive(Clone)]
pub struct QaseClient {
    pub projects: ProjectsClient,
    pub cases: CasesClient,
    pub results: ResultsClient,
    pub runs: RunsClient,
    pub plans: PlansClient,
    pub suites: SuitesClient,
    pub shared_steps: SharedStepsClient,
    pub defects: DefectsClient,
    pub search: SearchClient,
}

impl QaseClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let endpoint = Endpoint::new(transport);
        Self {
            projects: ProjectsClient::new(endpoint.clone()),
            cases: CasesClient::new(endpoint.clone()),
            results: ResultsClient::new(endpoint.clone()),
            runs: RunsClient::new(endpoint.clone()),
            plans: PlansClient::new(endpoint.clone()),
            suites: SuitesClient::new(endpoint.clone()),
            shared_steps: SharedStepsClient::new(endpoint.clone()),
            defects: DefectsClient::new(endpoint.clone()),
            search: SearchClient::new(endpoint),
        }
    }
}

impl std::fmt::Debug for QaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaseClient").finish()
    }
}

/// In-memory transport for tests: canned responses keyed by method and
/// path, plus a log of every request sent.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::{Method, StatusCode};
    use serde_json::Value;

    use super::*;

    type Responder = Box<dyn Fn(&ApiRequest) -> Result<Value, ApiError> + Send + Sync>;

    #[derive(Default)]
    pub(crate) struct FakeTransport {
        routes: Mutex<Vec<(Method, String, Responder)>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Answer every request matching method and path with `body`.
        pub(crate) fn respond(&self, method: Method, path: &str, body: Value) {
            self.respond_with(method, path, move |_| Ok(body.clone()));
        }

        /// Answer matching requests with an HTTP error.
        pub(crate) fn fail(&self, method: Method, path: &str, status: StatusCode, body: &str) {
            let body = body.to_string();
            self.respond_with(method, path, move |_| {
                Err(ApiError::HttpError {
                    status,
                    body: body.clone(),
                })
            });
        }

        pub(crate) fn respond_with<F>(&self, method: Method, path: &str, responder: F)
        where
            F: Fn(&ApiRequest) -> Result<Value, ApiError> + Send + Sync + 'static,
        {
            self.routes
                .lock()
                .unwrap()
                .push((method, path.to_string(), Box::new(responder)));
        }

        pub(crate) fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
            self.requests()
                .into_iter()
                .filter(|r| r.method == method && r.path == path)
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            let routes = self.routes.lock().unwrap();
            let route = routes
                .iter()
                .rev()
                .find(|(m, p, _)| *m == request.method && *p == request.path);
            match route {
                Some((_, _, responder)) => responder(&request),
                None => Err(ApiError::HttpError {
                    status: StatusCode::NOT_FOUND,
                    body: format!("no route for {} {}", request.method, request.path),
                }),
            }
        }
    }

    pub(crate) fn client(transport: &Arc<FakeTransport>) -> QaseClient {
        QaseClient::new(transport.clone())
    }
}
