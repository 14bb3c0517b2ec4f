//! MCP Server implementation exposing the Qase tool catalog.

use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, ErrorData as McpError, Implementation,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool,
    },
    service::RequestContext,
    RoleServer, ServerHandler,
};
use serde_json::Value;

use crate::debug::DebugLogger;
use crate::dispatcher::Dispatcher;
use crate::error::ToolError;

/// Qase MCP Server.
#[derive(Clone)]
pub struct QaseServer {
    dispatcher: Dispatcher,
    debug: Arc<DebugLogger>,
}

impl QaseServer {
    pub fn new(dispatcher: Dispatcher, debug: Arc<DebugLogger>) -> Self {
        Self { dispatcher, debug }
    }

    /// Catalog entries as MCP tool descriptors.
    fn tools(&self) -> Vec<Tool> {
        self.dispatcher
            .tools()
            .iter()
            .map(|tool| {
                Tool::new(
                    tool.name,
                    tool.description,
                    Arc::new(tool.schema.to_json_schema()),
                )
            })
            .collect()
    }

    async fn run_tool(&self, name: &str, args: Value) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call(name, &args);

        match self.dispatcher.dispatch(name, args).await {
            Ok(text) => {
                self.debug.log_tool_result(name, &text);
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                self.debug.log_error(name, &e.to_string());
                tracing::warn!(tool = name, error = %e, "tool call failed");
                Err(to_mcp_error(e))
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert a dispatcher error to McpError
fn to_mcp_error(e: ToolError) -> McpError {
    match e {
        ToolError::Validation(_) | ToolError::UnknownTool => {
            McpError::invalid_params(e.to_string(), None)
        }
        ToolError::Operation(_) | ToolError::Serialize(_) => {
            McpError::internal_error(e.to_string(), None)
        }
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

impl ServerHandler for QaseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Qase MCP Server - Manage Qase projects, test cases, runs, results, plans, \
                suites, shared steps and defects, link cases to Jira issues, run QQL searches \
                and analyze failed test runs."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(Default::default()));

        self.run_tool(request.name.as_ref(), args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, FakeTransport};
    use reqwest::{Method, StatusCode};
    use rmcp::model::ErrorCode;
    use serde_json::json;

    fn server(transport: &Arc<FakeTransport>) -> QaseServer {
        QaseServer::new(
            Dispatcher::new(client(transport)),
            Arc::new(DebugLogger::new(false)),
        )
    }

    #[test]
    fn test_tools_export_input_schemas() {
        let transport = FakeTransport::new();
        let tools = server(&transport).tools();
        assert_eq!(tools.len(), 42);

        let get_case = tools
            .iter()
            .find(|t| t.name == "get_case")
            .expect("get_case listed");
        assert_eq!(get_case.input_schema["type"], "object");
        assert_eq!(get_case.input_schema["required"], json!(["code", "id"]));
    }

    #[test]
    fn test_info_enables_tools() {
        let transport = FakeTransport::new();
        let info = server(&transport).get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap_or_default().contains("Qase"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let transport = FakeTransport::new();
        let err = server(&transport)
            .run_tool("nope", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.message, "Unknown tool");
    }

    #[tokio::test]
    async fn test_validation_error_is_invalid_params() {
        let transport = FakeTransport::new();
        let err = server(&transport)
            .run_tool("get_project", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("code"));
    }

    #[tokio::test]
    async fn test_upstream_error_is_internal_error() {
        let transport = FakeTransport::new();
        transport.fail(
            Method::GET,
            "/project/DEMO",
            StatusCode::NOT_FOUND,
            "Project not found",
        );
        let err = server(&transport)
            .run_tool("get_project", json!({"code": "DEMO"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("Project not found"));
    }

    #[tokio::test]
    async fn test_success_is_single_content_block() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::GET,
            "/project/DEMO",
            json!({"status": true, "result": {"code": "DEMO", "title": "Demo"}}),
        );
        let result = server(&transport)
            .run_tool("get_project", json!({"code": "DEMO"}))
            .await
            .unwrap();
        assert_eq!(result.content.len(), 1);
        assert_ne!(result.is_error, Some(true));
    }
}
