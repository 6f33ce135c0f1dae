// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project root and state-directory resolution.
//!
//! The state directory is always `<project>/.cleo/`; the global directory
//! mirrors a subset of it at `$HOME/.cleo/` for config and cross-project
//! metrics aggregation.

use std::path::{Path, PathBuf};

/// Paths to the four state documents plus the backup/global directories
/// rooted at one project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self { root: project_root.into() }
    }

    /// Discovers the nearest ancestor of `start` containing a `.cleo/`
    /// directory, falling back to `start` itself (so `add`-style commands
    /// can initialize a fresh project).
    pub fn discover(start: impl AsRef<Path>) -> Self {
        let mut dir = start.as_ref().to_path_buf();
        loop {
            if dir.join(".cleo").is_dir() {
                return Self::new(dir);
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => return Self::new(start.as_ref()),
            }
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".cleo")
    }

    pub fn todo_json(&self) -> PathBuf {
        self.state_dir().join("todo.json")
    }

    pub fn todo_archive_json(&self) -> PathBuf {
        self.state_dir().join("todo-archive.json")
    }

    pub fn sessions_json(&self) -> PathBuf {
        self.state_dir().join("sessions.json")
    }

    pub fn todo_log_jsonl(&self) -> PathBuf {
        self.state_dir().join("todo-log.jsonl")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.state_dir().join("backups")
    }

    pub fn sql_db(&self) -> PathBuf {
        self.state_dir().join("cleo.db")
    }

    pub fn config_json(&self) -> PathBuf {
        self.state_dir().join("config.json")
    }
}

/// `$HOME/.cleo/`: global config, project registry, aggregated metrics.
#[derive(Debug, Clone)]
pub struct GlobalPaths {
    root: PathBuf,
}

impl GlobalPaths {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { root: home.into() }
    }

    /// Resolves `$HOME/.cleo`, via `dirs::home_dir`.
    pub fn discover() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(".cleo")))
    }

    pub fn config_json(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn projects_json(&self) -> PathBuf {
        self.root.join("projects.json")
    }

    pub fn global_metrics_jsonl(&self) -> PathBuf {
        self.root.join("metrics").join("GLOBAL.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discover_walks_up_to_nearest_cleo_dir() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".cleo")).unwrap();
        let nested = tmp.path().join("src").join("sub");
        fs::create_dir_all(&nested).unwrap();

        let paths = ProjectPaths::discover(&nested);
        assert_eq!(paths.state_dir(), tmp.path().join(".cleo"));
    }

    #[test]
    fn document_paths_are_rooted_under_state_dir() {
        let paths = ProjectPaths::new("/proj");
        assert_eq!(paths.todo_json(), PathBuf::from("/proj/.cleo/todo.json"));
        assert_eq!(paths.todo_log_jsonl(), PathBuf::from("/proj/.cleo/todo-log.jsonl"));
    }
}
