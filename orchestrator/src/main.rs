// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cleo-orchestrator`: a thin CLI over the orchestrator engine.
//!
//! Orchestration is local: `cleo_core::orchestrator` computes wave-zero
//! readiness, next-task selection, and spawn-prompt assembly directly
//! against the project's own task graph, with no remote call and no PRD
//! input. This binary resolves `.cleo/`, builds a `FileAccessor`, and
//! prints the result of one orchestrator operation as JSON — the same
//! envelope the CLI and MCP front-ends use.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use cleo_core::{
    config::Config,
    models::TaskId,
    ops::{execute, OpContext, Operation},
};
use cleo_storage::{atomic, paths::{GlobalPaths, ProjectPaths}, FileAccessor};

#[derive(Parser)]
#[command(name = "cleo-orchestrator")]
#[command(about = "Wave-zero readiness, next-task selection, and subagent spawn prompts for one epic")]
struct Cli {
    #[arg(long, env = "PROJECT_ROOT")]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Task ids with no unmet dependency inside the epic (wave zero).
    Ready { epic_id: String },
    /// The single highest-leverage task to hand out next.
    Next { epic_id: String },
    /// Render the subagent spawn prompt for one task within an epic.
    Spawn { epic_id: String, task_id: String },
}

fn parse_task_id(raw: &str) -> Result<TaskId> {
    raw.parse().map_err(|_| anyhow::anyhow!("'{raw}' is not a valid task id"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let project_root = cli.project_root.unwrap_or(std::env::current_dir()?);
    let paths = ProjectPaths::discover(&project_root);

    let global = GlobalPaths::discover().and_then(|g| atomic::read_json(&g.config_json()).ok().flatten());
    let project = atomic::read_json(&paths.config_json()).ok().flatten();
    let config = Config::resolve(global.as_ref(), project.as_ref(), &std::collections::HashMap::new(), None);

    let accessor: Arc<dyn cleo_core::accessor::DataAccessor> = Arc::new(FileAccessor::new(&project_root));
    let ctx = OpContext { accessor: accessor.as_ref(), config: &config, now: Utc::now(), actor: "orchestrator".into() };

    let op = match cli.command {
        Command::Ready { epic_id } => Operation::OrchestratorReady(parse_task_id(&epic_id)?),
        Command::Next { epic_id } => Operation::OrchestratorNext(parse_task_id(&epic_id)?),
        Command::Spawn { epic_id, task_id } => {
            Operation::OrchestratorSpawn { epic_id: parse_task_id(&epic_id)?, task_id: parse_task_id(&task_id)? }
        }
    };

    let result = execute(op, &ctx).await.context("orchestrator operation failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
