// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `FileAccessor`: the default `DataAccessor` back-end.
//!
//! Reads and writes the three JSON documents under `.cleo/` through the
//! atomic file store (B) and appends to `todo-log.jsonl` through the
//! tolerant JSONL writer, stamping `_meta.schemaVersion` / `lastUpdated` /
//! `checksum` on every save.

use async_trait::async_trait;
use chrono::Utc;
use cleo_core::{
    accessor::{ArchiveDocument, DataAccessor, SessionsDocument, TodoDocument},
    audit::AuditEntry,
    error::{CleoError, Result},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::{atomic, paths::ProjectPaths};

/// Schema version stamped on every document this accessor writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub struct FileAccessor {
    paths: ProjectPaths,
    lock_table: Arc<atomic::LockTable>,
    owner: String,
}

impl FileAccessor {
    pub fn new(project_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            paths: ProjectPaths::new(project_root),
            lock_table: Arc::new(atomic::LockTable::default()),
            owner: format!("pid:{}", std::process::id()),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CleoError::Internal(e.to_string()))?
}

/// Serializes `doc` (whose `_meta` has just been reset) and embeds a fresh
/// checksum computed over the document with `_meta.checksum` cleared.
fn stamp_and_serialize<T: Serialize>(doc: &T) -> Result<Value> {
    let mut value = serde_json::to_value(doc).map_err(|e| CleoError::Internal(e.to_string()))?;
    if let Some(meta) = value.get_mut("_meta") {
        meta["checksum"] = Value::Null;
    }
    let checksum = atomic::compute_checksum(&value);
    if let Some(meta) = value.get_mut("_meta") {
        meta["checksum"] = Value::String(checksum);
    }
    Ok(value)
}

fn load_or_default<T: Default + for<'de> serde::Deserialize<'de>>(value: Option<Value>, label: &str) -> Result<T> {
    match value {
        Some(v) => serde_json::from_value(v).map_err(|e| CleoError::Validation(format!("{label}: {e}"))),
        None => Ok(T::default()),
    }
}

#[async_trait]
impl DataAccessor for FileAccessor {
    async fn load_todo(&self) -> Result<TodoDocument> {
        let path = self.paths.todo_json();
        let value = blocking(move || atomic::read_json(&path)).await?;
        load_or_default(value, "todo.json")
    }

    async fn save_todo(&self, doc: &TodoDocument) -> Result<()> {
        let mut doc = doc.clone();
        doc.meta.schema_version = CURRENT_SCHEMA_VERSION;
        doc.meta.last_updated = Some(Utc::now());
        let value = stamp_and_serialize(&doc)?;

        let path = self.paths.todo_json();
        let backup_dir = self.paths.backup_dir();
        let lock_table = self.lock_table.clone();
        let owner = self.owner.clone();
        blocking(move || {
            let opts = atomic::SaveOptions { backup_dir: Some(&backup_dir), ..Default::default() };
            atomic::save_json(&lock_table, &owner, &path, &value, &opts)
        })
        .await
    }

    async fn load_archive(&self) -> Result<ArchiveDocument> {
        let path = self.paths.todo_archive_json();
        let value = blocking(move || atomic::read_json(&path)).await?;
        load_or_default(value, "todo-archive.json")
    }

    async fn save_archive(&self, doc: &ArchiveDocument) -> Result<()> {
        let mut doc = doc.clone();
        doc.meta.schema_version = CURRENT_SCHEMA_VERSION;
        doc.meta.last_updated = Some(Utc::now());
        let value = stamp_and_serialize(&doc)?;

        let path = self.paths.todo_archive_json();
        let backup_dir = self.paths.backup_dir();
        let lock_table = self.lock_table.clone();
        let owner = self.owner.clone();
        blocking(move || {
            let opts = atomic::SaveOptions { backup_dir: Some(&backup_dir), ..Default::default() };
            atomic::save_json(&lock_table, &owner, &path, &value, &opts)
        })
        .await
    }

    async fn load_sessions(&self) -> Result<SessionsDocument> {
        let path = self.paths.sessions_json();
        let value = blocking(move || atomic::read_json(&path)).await?;
        load_or_default(value, "sessions.json")
    }

    async fn save_sessions(&self, doc: &SessionsDocument) -> Result<()> {
        let mut doc = doc.clone();
        doc.meta.schema_version = CURRENT_SCHEMA_VERSION;
        doc.meta.last_updated = Some(Utc::now());
        let value = stamp_and_serialize(&doc)?;

        let path = self.paths.sessions_json();
        let backup_dir = self.paths.backup_dir();
        let lock_table = self.lock_table.clone();
        let owner = self.owner.clone();
        blocking(move || {
            let opts = atomic::SaveOptions { backup_dir: Some(&backup_dir), ..Default::default() };
            atomic::save_json(&lock_table, &owner, &path, &value, &opts)
        })
        .await
    }

    async fn append_log(&self, entry: &AuditEntry) -> Result<()> {
        let value = serde_json::to_value(entry).map_err(|e| CleoError::Internal(e.to_string()))?;
        let path = self.paths.todo_log_jsonl();
        let lock_table = self.lock_table.clone();
        let owner = self.owner.clone();
        blocking(move || atomic::append_jsonl(&lock_table, &owner, &path, &value)).await
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cleo_core::models::{Task, TaskId, TaskType};
    use tempfile::tempdir;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task::new(TaskId::new(1), "Example".into(), TaskType::Task, now)
    }

    #[tokio::test]
    async fn todo_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let accessor = FileAccessor::new(dir.path());

        let mut doc = TodoDocument::default();
        doc.tasks.insert(TaskId::new(1), sample_task());
        accessor.save_todo(&doc).await.unwrap();

        let reloaded = accessor.load_todo().await.unwrap();
        assert_eq!(reloaded.tasks.len(), 1);
        assert_eq!(reloaded.meta.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(reloaded.meta.checksum.is_some());
    }

    #[tokio::test]
    async fn append_log_persists_entries() {
        let dir = tempdir().unwrap();
        let accessor = FileAccessor::new(dir.path());
        accessor.append_log(&AuditEntry::new("task.add", "tester", Utc::now())).await.unwrap();
        accessor.append_log(&AuditEntry::new("task.complete", "tester", Utc::now())).await.unwrap();

        let path = dir.path().join(".cleo").join("todo-log.jsonl");
        let entries = atomic::read_log_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn missing_documents_load_as_defaults() {
        let dir = tempdir().unwrap();
        let accessor = FileAccessor::new(dir.path());
        let doc = accessor.load_todo().await.unwrap();
        assert!(doc.tasks.is_empty());
    }
}
