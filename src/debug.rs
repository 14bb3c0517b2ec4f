//! Debug trace file for MCP tool traffic.
//!
//! Messages always go through `tracing`; when debug mode is on they are
//! also appended to `/tmp/qase_mcp_trace_<timestamp>.log`.

use chrono::Local;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const TOOL_PAYLOAD_LIMIT: usize = 1000;

/// Debug logger for MCP tool calls.
pub struct DebugLogger {
    enabled: bool,
    trace_file: Option<Mutex<File>>,
    trace_path: Option<PathBuf>,
}

impl DebugLogger {
    /// Create a new debug logger. A disabled logger never touches the filesystem.
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                enabled,
                trace_file: None,
                trace_path: None,
            };
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = std::env::temp_dir().join(format!("qase_mcp_trace_{}.log", timestamp));
        Self::with_path(path)
    }

    /// Create an enabled logger that writes to `path`.
    pub fn with_path(path: PathBuf) -> Self {
        let opened = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path);

        match opened {
            Ok(file) => Self {
                enabled: true,
                trace_file: Some(Mutex::new(file)),
                trace_path: Some(path),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to create trace file");
                Self {
                    enabled: true,
                    trace_file: None,
                    trace_path: None,
                }
            }
        }
    }

    /// Get the trace file path.
    pub fn trace_path(&self) -> Option<&Path> {
        self.trace_path.as_deref()
    }

    /// Log a message to tracing and the trace file.
    pub fn log(&self, message: &str) {
        if !self.enabled {
            return;
        }

        tracing::debug!("{}", message);

        if let Some(ref file) = self.trace_file {
            if let Ok(mut f) = file.lock() {
                let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                let _ = writeln!(f, "[{}] {}", timestamp, message);
                let _ = f.flush();
            }
        }
    }

    /// Log a tool call.
    pub fn log_tool_call(&self, tool_name: &str, params: &Value) {
        if !self.enabled {
            return;
        }

        self.log(&format!(
            "TOOL CALL: {} | params: {}",
            tool_name,
            truncate(&params.to_string(), TOOL_PAYLOAD_LIMIT)
        ));
    }

    /// Log a tool result.
    pub fn log_tool_result(&self, tool_name: &str, output: &str) {
        if !self.enabled {
            return;
        }

        self.log(&format!(
            "TOOL RESULT: {} | result: {}",
            tool_name,
            truncate(output, TOOL_PAYLOAD_LIMIT)
        ));
    }

    /// Log an error.
    pub fn log_error(&self, context: &str, error: &str) {
        if !self.enabled {
            return;
        }

        self.log(&format!("ERROR [{}]: {}", context, error));
    }
}

impl std::fmt::Debug for DebugLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugLogger")
            .field("enabled", &self.enabled)
            .field("trace_path", &self.trace_path)
            .finish()
    }
}

/// Cut `s` to at most `max_len` bytes on a char boundary.
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
