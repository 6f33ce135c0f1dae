// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dual-write back-end.
//!
//! Writes go to both the file store and the embedded-SQL store; reads
//! prefer SQL and fall back to files on failure, logging the discrepancy.

use async_trait::async_trait;
use cleo_core::{
    accessor::{ArchiveDocument, DataAccessor, SessionsDocument, TodoDocument},
    audit::AuditEntry,
    error::Result,
};

use crate::{fs_accessor::FileAccessor, sql::SqlAccessor};

pub struct DualAccessor {
    files: FileAccessor,
    sql: SqlAccessor,
}

impl DualAccessor {
    pub fn new(files: FileAccessor, sql: SqlAccessor) -> Self {
        Self { files, sql }
    }
}

macro_rules! prefer_sql {
    ($self:expr, $method:ident) => {{
        match $self.sql.$method().await {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(error = %e, "sql accessor read failed, falling back to file store");
                $self.files.$method().await
            }
        }
    }};
}

#[async_trait]
impl DataAccessor for DualAccessor {
    async fn load_todo(&self) -> Result<TodoDocument> {
        prefer_sql!(self, load_todo)
    }

    async fn save_todo(&self, doc: &TodoDocument) -> Result<()> {
        self.files.save_todo(doc).await?;
        self.sql.save_todo(doc).await
    }

    async fn load_archive(&self) -> Result<ArchiveDocument> {
        prefer_sql!(self, load_archive)
    }

    async fn save_archive(&self, doc: &ArchiveDocument) -> Result<()> {
        self.files.save_archive(doc).await?;
        self.sql.save_archive(doc).await
    }

    async fn load_sessions(&self) -> Result<SessionsDocument> {
        prefer_sql!(self, load_sessions)
    }

    async fn save_sessions(&self, doc: &SessionsDocument) -> Result<()> {
        self.files.save_sessions(doc).await?;
        self.sql.save_sessions(doc).await
    }

    async fn append_log(&self, entry: &AuditEntry) -> Result<()> {
        self.files.append_log(entry).await?;
        self.sql.append_log(entry).await
    }

    async fn close(&self) -> Result<()> {
        self.files.close().await?;
        self.sql.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_todo_writes_to_both_backends() {
        let dir = tempdir().unwrap();
        let files = FileAccessor::new(dir.path());
        let sql = SqlAccessor::connect("sqlite::memory:").await.unwrap();
        let dual = DualAccessor::new(files, sql);

        let doc = TodoDocument::default();
        dual.save_todo(&doc).await.unwrap();

        let reloaded = dual.load_todo().await.unwrap();
        assert!(reloaded.tasks.is_empty());
    }
}
