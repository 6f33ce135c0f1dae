// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data accessor trait.
//!
//! Hides whether state lives in separate JSON files or an embedded
//! key-value store. Every [`ops`](crate::ops) function takes an accessor
//! as an explicit parameter; nothing in this crate holds a accessor
//! globally. `cleo-storage` provides the file-only, embedded-SQL, and
//! dual-write implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    audit::AuditEntry,
    error::Result,
    models::{Project, Session, Task, TaskId},
};

/// Metadata block carried by every on-disk document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DocumentMeta {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
    pub checksum: Option<String>,
}

/// `.cleo/todo.json`: tasks plus the project/phase document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TodoDocument {
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    #[serde(default)]
    pub project: Project,
    #[serde(default, rename = "_meta")]
    pub meta: DocumentMeta,
}

/// `.cleo/todo-archive.json`: terminal tasks moved out of the active set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ArchiveDocument {
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    #[serde(default, rename = "_meta")]
    pub meta: DocumentMeta,
}

/// `.cleo/sessions.json`: sessions plus each session's focus history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionsDocument {
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    #[serde(default)]
    pub focus_history: BTreeMap<String, Vec<crate::models::FocusHistoryEntry>>,
    #[serde(default, rename = "_meta")]
    pub meta: DocumentMeta,
}

/// Uniform persistence surface over the four state documents.
///
/// Implementations must be `Send + Sync`: the MCP server and orchestrator
/// may hold one behind an `Arc` and call it from multiple tasks.
#[async_trait]
pub trait DataAccessor: Send + Sync {
    async fn load_todo(&self) -> Result<TodoDocument>;
    async fn save_todo(&self, doc: &TodoDocument) -> Result<()>;

    async fn load_archive(&self) -> Result<ArchiveDocument>;
    async fn save_archive(&self, doc: &ArchiveDocument) -> Result<()>;

    async fn load_sessions(&self) -> Result<SessionsDocument>;
    async fn save_sessions(&self, doc: &SessionsDocument) -> Result<()>;

    /// Append one audit entry to the tolerant-format JSONL audit log.
    async fn append_log(&self, entry: &AuditEntry) -> Result<()>;

    /// Release any held resources (file handles, pooled connections).
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_document_defaults_to_empty() {
        let doc = TodoDocument::default();
        assert!(doc.tasks.is_empty());
        assert_eq!(doc.meta.schema_version, 0);
    }
}
