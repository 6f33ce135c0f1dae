// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit/event log entries.
//!
//! This module defines the typed audit record every state-changing
//! [`ops`](crate::ops) function appends through a [`DataAccessor`](crate::accessor::DataAccessor).
//! The tolerant on-disk reader that accepts legacy hybrid shapes lives in
//! `cleo-storage`'s atomic file store (B); this module only owns the shape
//! of a single well-formed entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::TaskId;

/// One append-only audit record: one entry per state-changing operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub ts: DateTime<Utc>,
    pub op: String,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "taskId")]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "sessionId")]
    pub session_id: Option<String>,
}

impl AuditEntry {
    pub fn new(op: impl Into<String>, actor: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            ts,
            op: op.into(),
            actor: actor.into(),
            task_id: None,
            before: None,
            after: None,
            session_id: None,
        }
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_before_after(mut self, before: Option<Value>, after: Option<Value>) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_optional_fields() {
        let entry = AuditEntry::new("task.complete", "alpha", Utc::now())
            .with_task(TaskId::new(1))
            .with_session("session_20260101_000000_abcdef");
        assert_eq!(entry.task_id, Some(TaskId::new(1)));
        assert_eq!(entry.session_id.as_deref(), Some("session_20260101_000000_abcdef"));
    }
}
