// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded-SQL back-end: `SqlAccessor`.
//!
//! Mirrors the three JSON documents into SQLite tables (`tasks`,
//! `sessions`, `audit_log`, plus small satellite tables for the project
//! document and focus history), each row mapped back to its CLEO struct
//! through a small `FromRow`-style helper per table. Schema creation is a
//! handful of `CREATE TABLE IF NOT EXISTS` statements
//! run once at connection time rather than a `sqlx::migrate!` migration
//! set: CLEO's relational schema is a fixed mirror of the JSON documents,
//! not an independently evolving one.

use chrono::{DateTime, Utc};
use cleo_core::{
    accessor::{ArchiveDocument, DataAccessor, DocumentMeta, SessionsDocument, TodoDocument},
    audit::AuditEntry,
    error::{CleoError, Result},
    models::{FocusHistoryEntry, Project, Session, Task},
};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::collections::BTreeMap;

fn sql_err(e: sqlx::Error) -> CleoError {
    CleoError::Internal(format!("sql accessor: {e}"))
}

/// SQLite-backed mirror of the three state documents.
pub struct SqlAccessor {
    pool: SqlitePool,
}

impl SqlAccessor {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(sql_err)?;
        let accessor = Self { pool };
        accessor.create_schema().await?;
        Ok(accessor)
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                data TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS archive_tasks (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;

        sqlx::query("CREATE TABLE IF NOT EXISTS project (id INTEGER PRIMARY KEY CHECK (id = 1), data TEXT NOT NULL)")
            .execute(&self.pool)
            .await
            .map_err(sql_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                data TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS focus_history (
                session_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (session_id, seq)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit_log (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                data TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS doc_meta (
                doc TEXT PRIMARY KEY,
                schema_version INTEGER NOT NULL,
                last_updated TEXT,
                checksum TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;

        Ok(())
    }

    async fn load_meta(&self, doc: &str) -> Result<DocumentMeta> {
        let row = sqlx::query("SELECT schema_version, last_updated, checksum FROM doc_meta WHERE doc = ?")
            .bind(doc)
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_err)?;
        Ok(match row {
            Some(row) => DocumentMeta {
                schema_version: row.get::<i64, _>("schema_version") as u32,
                last_updated: row.get::<Option<DateTime<Utc>>, _>("last_updated"),
                checksum: row.get("checksum"),
            },
            None => DocumentMeta::default(),
        })
    }

    async fn save_meta(&self, doc: &str, meta: &DocumentMeta) -> Result<()> {
        sqlx::query(
            "INSERT INTO doc_meta (doc, schema_version, last_updated, checksum) VALUES (?, ?, ?, ?)
             ON CONFLICT(doc) DO UPDATE SET schema_version = excluded.schema_version,
                last_updated = excluded.last_updated, checksum = excluded.checksum",
        )
        .bind(doc)
        .bind(meta.schema_version as i64)
        .bind(meta.last_updated)
        .bind(&meta.checksum)
        .execute(&self.pool)
        .await
        .map_err(sql_err)?;
        Ok(())
    }

    fn stamp(meta_like: DocumentMeta, checksum_of: &Value) -> DocumentMeta {
        let mut meta = meta_like;
        meta.schema_version = crate::fs_accessor::CURRENT_SCHEMA_VERSION;
        meta.last_updated = Some(Utc::now());
        meta.checksum = Some(crate::atomic::compute_checksum(checksum_of));
        meta
    }
}

#[async_trait::async_trait]
impl DataAccessor for SqlAccessor {
    async fn load_todo(&self) -> Result<TodoDocument> {
        let rows = sqlx::query("SELECT data FROM tasks").fetch_all(&self.pool).await.map_err(sql_err)?;
        let mut tasks = BTreeMap::new();
        for row in rows {
            let data: String = row.get("data");
            let task: Task = serde_json::from_str(&data).map_err(|e| CleoError::Validation(e.to_string()))?;
            tasks.insert(task.id, task);
        }

        let project_row = sqlx::query("SELECT data FROM project WHERE id = 1").fetch_optional(&self.pool).await.map_err(sql_err)?;
        let project = match project_row {
            Some(row) => {
                let data: String = row.get("data");
                serde_json::from_str(&data).map_err(|e| CleoError::Validation(e.to_string()))?
            }
            None => Project::default(),
        };

        let meta = self.load_meta("todo").await?;
        Ok(TodoDocument { tasks, project, meta })
    }

    async fn save_todo(&self, doc: &TodoDocument) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(sql_err)?;
        sqlx::query("DELETE FROM tasks").execute(&mut *tx).await.map_err(sql_err)?;
        for task in doc.tasks.values() {
            let data = serde_json::to_string(task).map_err(|e| CleoError::Internal(e.to_string()))?;
            sqlx::query("INSERT INTO tasks (id, status, updated_at, data) VALUES (?, ?, ?, ?)")
                .bind(task.id.to_string())
                .bind(format!("{:?}", task.status))
                .bind(task.updated_at)
                .bind(data)
                .execute(&mut *tx)
                .await
                .map_err(sql_err)?;
        }
        let project_data = serde_json::to_string(&doc.project).map_err(|e| CleoError::Internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO project (id, data) VALUES (1, ?) ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        )
        .bind(project_data)
        .execute(&mut *tx)
        .await
        .map_err(sql_err)?;
        tx.commit().await.map_err(sql_err)?;

        let value = serde_json::to_value(doc).map_err(|e| CleoError::Internal(e.to_string()))?;
        let meta = Self::stamp(doc.meta.clone(), &value);
        self.save_meta("todo", &meta).await
    }

    async fn load_archive(&self) -> Result<ArchiveDocument> {
        let rows = sqlx::query("SELECT data FROM archive_tasks").fetch_all(&self.pool).await.map_err(sql_err)?;
        let mut tasks = BTreeMap::new();
        for row in rows {
            let data: String = row.get("data");
            let task: Task = serde_json::from_str(&data).map_err(|e| CleoError::Validation(e.to_string()))?;
            tasks.insert(task.id, task);
        }
        let meta = self.load_meta("archive").await?;
        Ok(ArchiveDocument { tasks, meta })
    }

    async fn save_archive(&self, doc: &ArchiveDocument) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(sql_err)?;
        sqlx::query("DELETE FROM archive_tasks").execute(&mut *tx).await.map_err(sql_err)?;
        for task in doc.tasks.values() {
            let data = serde_json::to_string(task).map_err(|e| CleoError::Internal(e.to_string()))?;
            sqlx::query("INSERT INTO archive_tasks (id, data) VALUES (?, ?)")
                .bind(task.id.to_string())
                .bind(data)
                .execute(&mut *tx)
                .await
                .map_err(sql_err)?;
        }
        tx.commit().await.map_err(sql_err)?;

        let value = serde_json::to_value(doc).map_err(|e| CleoError::Internal(e.to_string()))?;
        let meta = Self::stamp(doc.meta.clone(), &value);
        self.save_meta("archive", &meta).await
    }

    async fn load_sessions(&self) -> Result<SessionsDocument> {
        let rows = sqlx::query("SELECT data FROM sessions").fetch_all(&self.pool).await.map_err(sql_err)?;
        let mut sessions = BTreeMap::new();
        for row in rows {
            let data: String = row.get("data");
            let session: Session = serde_json::from_str(&data).map_err(|e| CleoError::Validation(e.to_string()))?;
            sessions.insert(session.id.as_str().to_string(), session);
        }

        let history_rows = sqlx::query("SELECT session_id, data FROM focus_history ORDER BY session_id, seq")
            .fetch_all(&self.pool)
            .await
            .map_err(sql_err)?;
        let mut focus_history: BTreeMap<String, Vec<FocusHistoryEntry>> = BTreeMap::new();
        for row in history_rows {
            let session_id: String = row.get("session_id");
            let data: String = row.get("data");
            let entry: FocusHistoryEntry = serde_json::from_str(&data).map_err(|e| CleoError::Validation(e.to_string()))?;
            focus_history.entry(session_id).or_default().push(entry);
        }

        let meta = self.load_meta("sessions").await?;
        Ok(SessionsDocument { sessions, focus_history, meta })
    }

    async fn save_sessions(&self, doc: &SessionsDocument) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(sql_err)?;
        sqlx::query("DELETE FROM sessions").execute(&mut *tx).await.map_err(sql_err)?;
        sqlx::query("DELETE FROM focus_history").execute(&mut *tx).await.map_err(sql_err)?;

        for session in doc.sessions.values() {
            let data = serde_json::to_string(session).map_err(|e| CleoError::Internal(e.to_string()))?;
            sqlx::query("INSERT INTO sessions (id, status, data) VALUES (?, ?, ?)")
                .bind(session.id.as_str())
                .bind(format!("{:?}", session.status))
                .bind(data)
                .execute(&mut *tx)
                .await
                .map_err(sql_err)?;
        }

        for (session_id, history) in &doc.focus_history {
            for (seq, entry) in history.iter().enumerate() {
                let data = serde_json::to_string(entry).map_err(|e| CleoError::Internal(e.to_string()))?;
                sqlx::query("INSERT INTO focus_history (session_id, seq, data) VALUES (?, ?, ?)")
                    .bind(session_id)
                    .bind(seq as i64)
                    .bind(data)
                    .execute(&mut *tx)
                    .await
                    .map_err(sql_err)?;
            }
        }
        tx.commit().await.map_err(sql_err)?;

        let value = serde_json::to_value(doc).map_err(|e| CleoError::Internal(e.to_string()))?;
        let meta = Self::stamp(doc.meta.clone(), &value);
        self.save_meta("sessions", &meta).await
    }

    async fn append_log(&self, entry: &AuditEntry) -> Result<()> {
        let data = serde_json::to_string(entry).map_err(|e| CleoError::Internal(e.to_string()))?;
        sqlx::query("INSERT INTO audit_log (ts, data) VALUES (?, ?)")
            .bind(entry.ts)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(sql_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleo_core::models::{TaskId, TaskType};

    #[tokio::test]
    async fn save_then_load_todo_round_trips() {
        let accessor = SqlAccessor::connect("sqlite::memory:").await.unwrap();
        let mut doc = TodoDocument::default();
        let now = Utc::now();
        doc.tasks.insert(TaskId::new(1), Task::new(TaskId::new(1), "Example".into(), TaskType::Task, now));
        accessor.save_todo(&doc).await.unwrap();

        let reloaded = accessor.load_todo().await.unwrap();
        assert_eq!(reloaded.tasks.len(), 1);
        assert!(reloaded.meta.checksum.is_some());
    }

    #[tokio::test]
    async fn append_log_accumulates_rows() {
        let accessor = SqlAccessor::connect("sqlite::memory:").await.unwrap();
        accessor.append_log(&AuditEntry::new("task.add", "tester", Utc::now())).await.unwrap();
        let row = sqlx::query("SELECT COUNT(*) as c FROM audit_log").fetch_one(&accessor.pool).await.unwrap();
        let count: i64 = row.get("c");
        assert_eq!(count, 1);
    }
}
