// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-built fixtures covering the common task/session states tests need.

use chrono::Utc;
use cleo_core::models::{Focus, Scope, Session, SessionId, SessionStatus, Task, TaskId, TaskStatus, TaskType};

use crate::builders::TaskBuilder;

pub fn pending_task() -> Task {
    TaskBuilder::new().with_id(1).with_title("Pending task").build()
}

pub fn task_with_status(id: u64, status: TaskStatus) -> Task {
    TaskBuilder::new().with_id(id).with_status(status).build()
}

/// One task per `TaskStatus` variant, ids 1..=5 in declaration order.
pub fn tasks_in_all_statuses() -> Vec<Task> {
    [TaskStatus::Pending, TaskStatus::Active, TaskStatus::Blocked, TaskStatus::Done, TaskStatus::Cancelled]
        .into_iter()
        .enumerate()
        .map(|(i, status)| task_with_status(i as u64 + 1, status))
        .collect()
}

/// An epic with `count` direct children, ids allocated epic=1, children 2..count+1.
pub fn epic_with_children(count: u64) -> Vec<Task> {
    let epic = TaskBuilder::new().with_id(1).with_title("Epic").with_type(TaskType::Epic).build();
    let mut tasks = vec![epic];
    for i in 0..count {
        let id = i + 2;
        tasks.push(TaskBuilder::new().with_id(id).with_title(format!("Child {id}")).with_parent(TaskId::new(1)).build());
    }
    tasks
}

pub fn active_session(id_suffix: &str) -> Session {
    let now = Utc::now();
    Session {
        id: SessionId::new(now, id_suffix),
        name: "test-session".into(),
        status: SessionStatus::Active,
        scope: Scope::Global,
        focus: Focus { task_id: None, set_at: None },
        agent: Some("test-agent".into()),
        started_at: now,
        ended_at: None,
        notes: Vec::new(),
        tasks_completed: Vec::new(),
        tasks_created: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_in_all_statuses_covers_every_variant() {
        let tasks = tasks_in_all_statuses();
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[3].status, TaskStatus::Done);
    }

    #[test]
    fn epic_with_children_links_parent_ids() {
        let tasks = epic_with_children(3);
        assert_eq!(tasks.len(), 4);
        assert!(tasks[1..].iter().all(|t| t.parent_id == Some(TaskId::new(1))));
    }
}
