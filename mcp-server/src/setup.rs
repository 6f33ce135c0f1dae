// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires [`Settings`] into a running [`CleoMcpServer`].

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use cleo_core::{accessor::DataAccessor, config::Config as CoreConfig};
use cleo_storage::{atomic, dual::DualAccessor, fs_accessor::FileAccessor, paths::{GlobalPaths, ProjectPaths}, sql::SqlAccessor};
use cleo_mcp_protocol::CleoMcpServer;
use tracing::info;

use crate::config::{Backend, Settings};

/// Ensures `.cleo/` exists under the project root so a fresh checkout can
/// be pointed at without a separate `cleo init` step.
pub fn ensure_state_dir(paths: &ProjectPaths) -> Result<()> {
    std::fs::create_dir_all(paths.state_dir()).context("failed to create .cleo directory")
}

pub async fn build_accessor(settings: &Settings, paths: &ProjectPaths) -> Result<Arc<dyn DataAccessor>> {
    match settings.backend {
        Backend::File => {
            info!("using file-backed accessor");
            Ok(Arc::new(FileAccessor::new(&settings.project_root).with_owner(settings.actor.clone())))
        }
        Backend::Sql => {
            let url = format!("sqlite://{}?mode=rwc", paths.sql_db().display());
            info!(url = %url, "using sql-backed accessor");
            Ok(Arc::new(SqlAccessor::connect(&url).await.context("failed to connect sql accessor")?))
        }
        Backend::Dual => {
            let url = format!("sqlite://{}?mode=rwc", paths.sql_db().display());
            info!(url = %url, "using dual file+sql accessor");
            let files = FileAccessor::new(&settings.project_root).with_owner(settings.actor.clone());
            let sql = SqlAccessor::connect(&url).await.context("failed to connect sql accessor")?;
            Ok(Arc::new(DualAccessor::new(files, sql)))
        }
    }
}

/// Resolves `cleo_core::config::Config` from global + project `config.json`
/// layers plus `CLEO_*` environment variables,.
pub fn resolve_config(paths: &ProjectPaths) -> Result<CoreConfig> {
    let global = GlobalPaths::discover().and_then(|g| atomic::read_json(&g.config_json()).ok().flatten());
    let project = atomic::read_json(&paths.config_json()).ok().flatten();
    let env_vars: HashMap<String, String> = env::vars().filter(|(k, _)| k.starts_with("CLEO_")).collect();
    Ok(CoreConfig::resolve(global.as_ref(), project.as_ref(), &env_vars, None))
}

pub async fn initialize_app(settings: &Settings) -> Result<CleoMcpServer> {
    let paths = ProjectPaths::discover(&settings.project_root);
    ensure_state_dir(&paths)?;

    let config = resolve_config(&paths)?;
    let accessor = build_accessor(settings, &paths).await?;

    info!(actor = %settings.actor, backend = ?settings.backend, "application initialized");
    Ok(CleoMcpServer::new(accessor, config, settings.actor.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn file_backend_builds_without_a_database() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            project_root: dir.path().to_path_buf(),
            log_level: "info".into(),
            log_format: crate::config::LogFormat::Pretty,
            backend: Backend::File,
            actor: "test".into(),
        };
        let server = initialize_app(&settings).await;
        assert!(server.is_ok());
        assert!(dir.path().join(".cleo").is_dir());
    }
}
