// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`DataAccessor`] for testing ops/orchestrator logic without touching disk.
//!
//! Features:
//! - Thread-safe concurrent access
//! - Error injection for failure testing
//! - Call history tracking for verification

use std::sync::Arc;

use async_trait::async_trait;
use cleo_core::accessor::{ArchiveDocument, DataAccessor, SessionsDocument, TodoDocument};
use cleo_core::audit::AuditEntry;
use cleo_core::error::{CleoError, Result};
use parking_lot::Mutex;

/// In-memory [`DataAccessor`] backed by three documents held behind a mutex apiece.
pub struct MockDataAccessor {
    todo: Mutex<TodoDocument>,
    archive: Mutex<ArchiveDocument>,
    sessions: Mutex<SessionsDocument>,
    log: Mutex<Vec<AuditEntry>>,
    error_injection: Mutex<Option<String>>,
    call_history: Mutex<Vec<String>>,
}

impl Default for MockDataAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDataAccessor {
    pub fn new() -> Self {
        Self {
            todo: Mutex::new(TodoDocument::default()),
            archive: Mutex::new(ArchiveDocument::default()),
            sessions: Mutex::new(SessionsDocument::default()),
            log: Mutex::new(Vec::new()),
            error_injection: Mutex::new(None),
            call_history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_todo(todo: TodoDocument) -> Self {
        let mock = Self::new();
        *mock.todo.lock() = todo;
        mock
    }

    /// Inject an error message that the next call will return.
    pub fn inject_error(&self, message: impl Into<String>) {
        *self.error_injection.lock() = Some(message.into());
    }

    pub fn clear_error(&self) {
        *self.error_injection.lock() = None;
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(history.iter().any(|call| call == method), "method '{method}' was not called: {:?}", *history);
    }

    pub fn logged_entries(&self) -> Vec<AuditEntry> {
        self.log.lock().clone()
    }

    fn check_error_injection(&self) -> Result<()> {
        if let Some(message) = self.error_injection.lock().take() {
            return Err(CleoError::Internal(message));
        }
        Ok(())
    }

    fn record(&self, method: &str) {
        self.call_history.lock().push(method.to_string());
    }
}

#[async_trait]
impl DataAccessor for MockDataAccessor {
    async fn load_todo(&self) -> Result<TodoDocument> {
        self.record("load_todo");
        self.check_error_injection()?;
        Ok(self.todo.lock().clone())
    }

    async fn save_todo(&self, doc: &TodoDocument) -> Result<()> {
        self.record("save_todo");
        self.check_error_injection()?;
        *self.todo.lock() = doc.clone();
        Ok(())
    }

    async fn load_archive(&self) -> Result<ArchiveDocument> {
        self.record("load_archive");
        self.check_error_injection()?;
        Ok(self.archive.lock().clone())
    }

    async fn save_archive(&self, doc: &ArchiveDocument) -> Result<()> {
        self.record("save_archive");
        self.check_error_injection()?;
        *self.archive.lock() = doc.clone();
        Ok(())
    }

    async fn load_sessions(&self) -> Result<SessionsDocument> {
        self.record("load_sessions");
        self.check_error_injection()?;
        Ok(self.sessions.lock().clone())
    }

    async fn save_sessions(&self, doc: &SessionsDocument) -> Result<()> {
        self.record("save_sessions");
        self.check_error_injection()?;
        *self.sessions.lock() = doc.clone();
        Ok(())
    }

    async fn append_log(&self, entry: &AuditEntry) -> Result<()> {
        self.record("append_log");
        self.check_error_injection()?;
        self.log.lock().push(entry.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record("close");
        Ok(())
    }
}

pub fn shared_mock() -> Arc<dyn DataAccessor> {
    Arc::new(MockDataAccessor::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_saved_todo_document() {
        let mock = MockDataAccessor::new();
        let doc = TodoDocument::default();
        mock.save_todo(&doc).await.unwrap();
        mock.load_todo().await.unwrap();
        mock.assert_called("save_todo");
        mock.assert_called("load_todo");
    }

    #[tokio::test]
    async fn injected_error_surfaces_once() {
        let mock = MockDataAccessor::new();
        mock.inject_error("boom");
        assert!(mock.load_todo().await.is_err());
        assert!(mock.load_todo().await.is_ok());
    }
}
