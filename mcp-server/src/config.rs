// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-facing settings for the stdio binary.
//!
//! The binary's own settings are three scalars read straight from the
//! environment/CLI flags; [`cleo_core::config::Config`] owns the actual
//! layered merge of defaults, global config, project config, and
//! environment variables.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// JSON state documents under `.cleo/`, the default.
    File,
    /// SQLite mirror only, `.cleo/cleo.db`.
    Sql,
    /// Writes to both, reads prefer SQL.
    Dual,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    pub backend: Backend,
    pub actor: String,
}

impl Settings {
    pub fn from_env_and_cwd(project_root: Option<PathBuf>) -> anyhow::Result<Self> {
        let project_root = match project_root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let log_level = env::var("CLEO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("CLEO_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };
        let backend = match env::var("CLEO_BACKEND").as_deref() {
            Ok("sql") => Backend::Sql,
            Ok("dual") => Backend::Dual,
            _ => Backend::File,
        };
        let actor = env::var("CLEO_ACTOR").unwrap_or_else(|_| "mcp".to_string());

        Ok(Self { project_root, log_level, log_format, backend, actor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_pretty_file_backend() {
        env::remove_var("CLEO_LOG_FORMAT");
        env::remove_var("CLEO_BACKEND");
        let settings = Settings::from_env_and_cwd(Some(PathBuf::from("/tmp"))).unwrap();
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert_eq!(settings.backend, Backend::File);
    }

    #[test]
    fn backend_is_read_from_env() {
        env::set_var("CLEO_BACKEND", "dual");
        let settings = Settings::from_env_and_cwd(Some(PathBuf::from("/tmp"))).unwrap();
        assert_eq!(settings.backend, Backend::Dual);
        env::remove_var("CLEO_BACKEND");
    }
}
