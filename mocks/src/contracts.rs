// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contract tests for [`DataAccessor`] implementations.
//!
//! Any backend (file, sql, dual) should pass this suite: round-trip each
//! document unchanged, and report no entries until something is saved.

use cleo_core::accessor::DataAccessor;
use cleo_core::audit::AuditEntry;
use cleo_core::models::{Task, TaskId, TaskType};
use chrono::Utc;

pub async fn test_accessor_contract<A: DataAccessor>(accessor: &A) {
    test_todo_round_trip(accessor).await;
    test_archive_round_trip(accessor).await;
    test_sessions_round_trip(accessor).await;
    test_append_log(accessor).await;
}

pub async fn test_todo_round_trip<A: DataAccessor>(accessor: &A) {
    let mut doc = accessor.load_todo().await.expect("initial load should succeed");
    let task = Task::new(TaskId::new(1), "Contract task".to_string(), TaskType::Task, Utc::now());
    doc.tasks.insert(task.id, task.clone());

    accessor.save_todo(&doc).await.expect("save should succeed");
    let reloaded = accessor.load_todo().await.expect("reload should succeed");
    assert_eq!(reloaded.tasks.get(&task.id), Some(&task), "saved task should round-trip unchanged");
}

pub async fn test_archive_round_trip<A: DataAccessor>(accessor: &A) {
    let mut doc = accessor.load_archive().await.expect("initial archive load should succeed");
    let task = Task::new(TaskId::new(2), "Archived task".to_string(), TaskType::Task, Utc::now());
    doc.tasks.insert(task.id, task.clone());

    accessor.save_archive(&doc).await.expect("archive save should succeed");
    let reloaded = accessor.load_archive().await.expect("archive reload should succeed");
    assert_eq!(reloaded.tasks.get(&task.id), Some(&task));
}

pub async fn test_sessions_round_trip<A: DataAccessor>(accessor: &A) {
    let doc = accessor.load_sessions().await.expect("initial sessions load should succeed");
    accessor.save_sessions(&doc).await.expect("sessions save should succeed");
    let reloaded = accessor.load_sessions().await.expect("sessions reload should succeed");
    assert_eq!(reloaded.sessions.len(), doc.sessions.len());
}

pub async fn test_append_log<A: DataAccessor>(accessor: &A) {
    let entry = AuditEntry {
        ts: Utc::now(),
        op: "task.add".into(),
        actor: "test".into(),
        task_id: Some(TaskId::new(1)),
        before: None,
        after: None,
        session_id: None,
    };
    accessor.append_log(&entry).await.expect("append_log should succeed");
}
