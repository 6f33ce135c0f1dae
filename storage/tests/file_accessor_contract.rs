// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use cleo_core::{
    accessor::{DataAccessor, TodoDocument},
    audit::AuditEntry,
    models::{Task, TaskId, TaskType},
};
use cleo_storage::FileAccessor;
use tempfile::tempdir;

#[tokio::test]
async fn save_is_visible_through_a_fresh_accessor_over_the_same_project() {
    let dir = tempdir().unwrap();

    let writer = FileAccessor::new(dir.path());
    let mut doc = TodoDocument::default();
    let now = Utc::now();
    doc.tasks.insert(TaskId::new(1), Task::new(TaskId::new(1), "First task".into(), TaskType::Task, now));
    writer.save_todo(&doc).await.unwrap();

    let reader = FileAccessor::new(dir.path());
    let reloaded = reader.load_todo().await.unwrap();
    assert_eq!(reloaded.tasks.len(), 1);
    assert_eq!(reloaded.tasks[&TaskId::new(1)].title, "First task");
}

#[tokio::test]
async fn checksum_changes_when_the_document_changes() {
    let dir = tempdir().unwrap();
    let accessor = FileAccessor::new(dir.path());

    let mut doc = TodoDocument::default();
    accessor.save_todo(&doc).await.unwrap();
    let first = accessor.load_todo().await.unwrap().meta.checksum;

    doc.tasks.insert(TaskId::new(1), Task::new(TaskId::new(1), "New".into(), TaskType::Task, Utc::now()));
    accessor.save_todo(&doc).await.unwrap();
    let second = accessor.load_todo().await.unwrap().meta.checksum;

    assert_ne!(first, second);
}

#[tokio::test]
async fn audit_log_survives_interleaved_appends_and_reloads() {
    let dir = tempdir().unwrap();
    let accessor = FileAccessor::new(dir.path());

    for i in 0..5 {
        accessor.append_log(&AuditEntry::new(format!("op.{i}"), "tester", Utc::now())).await.unwrap();
    }

    let path = dir.path().join(".cleo").join("todo-log.jsonl");
    let entries = cleo_storage::atomic::read_log_entries(&path).unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0]["op"], "op.0");
    assert_eq!(entries[4]["op"], "op.4");
}

#[tokio::test]
async fn backups_are_written_on_overwrite() {
    let dir = tempdir().unwrap();
    let accessor = FileAccessor::new(dir.path());

    accessor.save_todo(&TodoDocument::default()).await.unwrap();
    let mut doc = TodoDocument::default();
    doc.tasks.insert(TaskId::new(1), Task::new(TaskId::new(1), "Second save".into(), TaskType::Task, Utc::now()));
    accessor.save_todo(&doc).await.unwrap();

    let backups = std::fs::read_dir(dir.path().join(".cleo").join("backups")).unwrap();
    assert!(backups.count() >= 1);
}
