//! Configuration management for the Qase MCP Server.
//!
//! Values come from three layers. Command-line flags win over environment
//! variables (both handled by clap), which win over the JSON config file.

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Qase public API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.qase.io/v1";

/// Config file name looked up in the home directory.
const DEFAULT_CONFIG_FILE: &str = ".qase-mcp-server.json";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "qase-mcp")]
#[command(author, version, about = "Qase MCP Server", long_about = None)]
pub struct Args {
    /// Qase API token
    #[arg(short, long, env = "QASE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to configuration file (default: ~/.qase-mcp-server.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug mode (logs all tool calls)
    #[arg(short, long)]
    pub debug: bool,

    /// Qase API base URL
    #[arg(long, env = "QASE_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Write the supplied token and base URL into the config file
    #[arg(long)]
    pub save_config: bool,
}

/// Contents of the JSON config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub debug: bool,
    pub api_base_url: String,
    pub timeout_seconds: Option<u64>,
    pub config_path: Option<PathBuf>,
}

/// `~/.qase-mcp-server.json`, when a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE))
}

impl Config {
    /// Read the config file and merge it with the command line.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let (path, file) = match &args.config {
            Some(path) => (Some(path.clone()), read_config_file(path)?),
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    let file = read_config_file(&path)?;
                    (Some(path), file)
                }
                path => (path, FileConfig::default()),
            },
        };

        let mut config = Self::resolve(args, file)?;
        config.config_path = path;
        Ok(config)
    }

    /// Merge command-line values over file values and validate the result.
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let api_token = args
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or(file.api_token.filter(|t| !t.trim().is_empty()))
            .ok_or_else(|| ConfigError::MissingField("apiToken".into()))?;

        let api_base_url = args
            .base_url
            .clone()
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "apiBaseUrl must be an http(s) URL, got '{}'",
                api_base_url
            )));
        }

        if file.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "timeoutSeconds must be greater than zero".into(),
            ));
        }

        Ok(Self {
            api_token,
            debug: args.debug || file.debug.unwrap_or(false),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            timeout_seconds: file.timeout_seconds,
            config_path: None,
        })
    }

    /// Get timeout as Duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Token prefix safe for logs.
    pub fn redacted_token(&self) -> String {
        let prefix: String = self.api_token.chars().take(4).collect();
        format!("{}...", prefix)
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Merge `partial` into the JSON file at `path`, keeping keys it does not set.
pub fn save_config(partial: &FileConfig, path: &Path) -> Result<(), ConfigError> {
    let mut current = if path.exists() {
        match serde_json::from_str(&std::fs::read_to_string(path)?)? {
            Value::Object(map) => map,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "{} does not contain a JSON object",
                    path.display()
                )))
            }
        }
    } else {
        Map::new()
    };

    if let Value::Object(updates) = serde_json::to_value(partial)? {
        current.extend(updates);
    }

    let content = serde_json::to_string_pretty(&Value::Object(current))?;
    std::fs::write(path, content)?;
    Ok(())
}
