// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom assertion helpers for task-centric tests.

use cleo_core::models::{Task, TaskId, TaskStatus};

/// Assert tasks are equal ignoring timestamps.
pub fn assert_task_equals(actual: &Task, expected: &Task) {
    assert_eq!(actual.id, expected.id, "task ids don't match");
    assert_eq!(actual.title, expected.title, "task titles don't match");
    assert_eq!(actual.description, expected.description, "task descriptions don't match");
    assert_eq!(actual.status, expected.status, "task statuses don't match");
    assert_eq!(actual.parent_id, expected.parent_id, "task parents don't match");
}

pub fn assert_task_equals_exact(actual: &Task, expected: &Task) {
    assert_eq!(actual, expected, "tasks are not exactly equal");
}

/// Assert task matches partial criteria.
pub fn assert_task_matches(task: &Task, matcher: &TaskMatcher) {
    if let Some(expected_id) = matcher.id {
        assert_eq!(task.id, expected_id, "task id doesn't match expected");
    }
    if let Some(ref expected_title) = matcher.title {
        assert_eq!(&task.title, expected_title, "task title doesn't match expected");
    }
    if let Some(expected_status) = matcher.status {
        assert_eq!(task.status, expected_status, "task status doesn't match expected");
    }
    if let Some(expected_parent) = matcher.parent_id {
        assert_eq!(task.parent_id, Some(expected_parent), "task parent doesn't match expected");
    }
}

/// Assert a task list contains a task with the given title.
pub fn assert_contains_task_titled(tasks: &[Task], title: &str) {
    assert!(
        tasks.iter().any(|t| t.title == title),
        "expected to find a task titled '{title}', available: {:?}",
        tasks.iter().map(|t| &t.title).collect::<Vec<_>>()
    );
}

/// Assert tasks are sorted by creation date, most recent first.
pub fn assert_tasks_sorted_by_created_at(tasks: &[Task]) {
    for window in tasks.windows(2) {
        assert!(
            window[0].created_at >= window[1].created_at,
            "tasks are not sorted by created_at (most recent first): '{}' ({}) comes before '{}' ({})",
            window[0].title,
            window[0].created_at,
            window[1].title,
            window[1].created_at
        );
    }
}

/// Flexible task matcher for partial assertions.
#[derive(Debug, Default)]
pub struct TaskMatcher {
    pub id: Option<TaskId>,
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub parent_id: Option<TaskId>,
}

impl TaskMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::TaskBuilder;

    #[test]
    fn matcher_checks_only_the_fields_that_were_set() {
        let task = TaskBuilder::new().with_id(3).with_title("Ship it").with_status(TaskStatus::Active).build();
        assert_task_matches(&task, &TaskMatcher::new().with_status(TaskStatus::Active));
    }
}
