// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mcp_server::{config::Settings, init_telemetry, initialize_app};
use rmcp::{transport::stdio, ServiceExt};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cleo-mcp")]
#[command(about = "CLEO MCP server, stdio transport")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Project root containing (or to receive) a `.cleo/` state directory.
    #[arg(long, env = "PROJECT_ROOT")]
    project_root: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, env = "CLEO_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env_and_cwd(cli.project_root).context("failed to resolve settings")?;
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }

    init_telemetry(&settings.log_level, settings.log_format).context("failed to initialize telemetry")?;
    info!(project_root = %settings.project_root.display(), "starting cleo-mcp");

    let server = initialize_app(&settings).await.context("failed to initialize application")?;

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!(error = %e, "failed to start stdio transport");
    })?;

    service.waiting().await.context("mcp server terminated with an error")?;
    info!("cleo-mcp shut down cleanly");
    Ok(())
}
