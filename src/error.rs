//! Unified error types for the Qase MCP Server.

use reqwest::StatusCode;
use thiserror::Error;

use crate::schema::ValidationErrors;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Qase API request/response errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    /// Structured Qase rejection; displays the upstream message as sent.
    #[error("{message}")]
    Qase { status: StatusCode, message: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to create HTTP client: {0}")]
    HttpClientInit(String),
}

/// Errors surfaced to the MCP caller by the tool dispatcher.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Unknown tool")]
    UnknownTool,

    #[error("{0}")]
    Operation(String),

    #[error("Failed to serialize tool output: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldError;

    #[test]
    fn test_config_error_missing_field_display() {
        let error = ConfigError::MissingField("apiToken".to_string());
        assert_eq!(error.to_string(), "Missing required field: apiToken");
    }

    #[test]
    fn test_config_error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(config_err.to_string().contains("IO error"));
    }

    #[test]
    fn test_api_error_http_error_display() {
        let error = ApiError::HttpError {
            status: StatusCode::NOT_FOUND,
            body: "Resource not found".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("404"));
        assert!(display.contains("Resource not found"));
    }

    #[test]
    fn test_api_error_qase_display() {
        let error = ApiError::Qase {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Data is invalid. title: required".to_string(),
        };
        assert_eq!(error.to_string(), "Data is invalid. title: required");
    }

    #[test]
    fn test_tool_error_unknown_tool_is_fixed() {
        assert_eq!(ToolError::UnknownTool.to_string(), "Unknown tool");
    }

    #[test]
    fn test_tool_error_validation_lists_fields() {
        let errors = ValidationErrors(vec![
            FieldError::new("code", "is required"),
            FieldError::new("id", "expected integer"),
        ]);
        let display = ToolError::from(errors).to_string();
        assert!(display.contains("code: is required"));
        assert!(display.contains("id: expected integer"));
    }

    #[test]
    fn test_tool_error_operation_is_verbatim() {
        let error = ToolError::Operation("Unauthenticated.".into());
        assert_eq!(error.to_string(), "Unauthenticated.");
    }
}
