//! Qase MCP Server
//!
//! Bridges the Qase test management API to the Model Context Protocol.

mod api;
mod config;
mod debug;
mod dispatcher;
mod envelope;
mod error;
mod http;
mod operations;
mod schema;
mod server;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

use crate::api::QaseClient;
use crate::config::{default_config_path, save_config, Args, Config, FileConfig};
use crate::debug::DebugLogger;
use crate::dispatcher::Dispatcher;
use crate::http::ReqwestTransport;
use crate::server::QaseServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args).context("failed to load configuration")?;

    // stdout carries the MCP transport, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.debug { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.save_config {
        let path = args
            .config
            .clone()
            .or_else(default_config_path)
            .context("no home directory for the default config file")?;
        let partial = FileConfig {
            api_token: Some(config.api_token.clone()),
            api_base_url: Some(config.api_base_url.clone()),
            ..Default::default()
        };
        save_config(&partial, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "configuration saved");
    }

    // Initialize debug logger
    let debug = Arc::new(DebugLogger::new(config.debug));

    if config.debug {
        debug.log("Qase MCP Server starting...");
        if let Some(path) = &config.config_path {
            debug.log(&format!("Config file: {}", path.display()));
        }
        debug.log(&format!("Base URL: {}", config.api_base_url));
        debug.log(&format!("API token: {}", config.redacted_token()));
        if let Some(path) = debug.trace_path() {
            tracing::info!(path = %path.display(), "trace file");
        }
    }

    // Create API client
    let transport = ReqwestTransport::new(
        config.api_base_url.clone(),
        config.api_token.clone(),
        config.timeout(),
    )?;
    let client = QaseClient::new(Arc::new(transport));

    // Create MCP server
    let server = QaseServer::new(Dispatcher::new(client), debug.clone());

    if config.debug {
        debug.log("Starting MCP server on stdio transport...");
    }

    // Run MCP server on stdio transport
    let service = server.serve(stdio()).await?;

    if config.debug {
        debug.log("MCP server started, waiting for messages...");
    }

    // Wait for the service to complete
    service.waiting().await?;

    if config.debug {
        debug.log("MCP server shutting down");
    }

    Ok(())
}
