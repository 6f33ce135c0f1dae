// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fluent builders for constructing `Task`/`NewTask`/`UpdateTask`/`TaskFilter`
//! fixtures in tests without repeating every field.

use chrono::{DateTime, Utc};
use cleo_core::models::{Priority, Task, TaskFilter, TaskId, TaskSize, TaskStatus, TaskType, UpdateTask};
use std::collections::BTreeSet;

pub struct TaskBuilder {
    task: Task,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self { task: Task::new(TaskId::new(1), "Test task".to_string(), TaskType::Task, Utc::now()) }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.task.id = TaskId::new(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        if status == TaskStatus::Done && self.task.completed_at.is_none() {
            self.task.completed_at = Some(Utc::now());
        }
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task.task_type = task_type;
        self
    }

    pub fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.task.parent_id = Some(parent_id);
        self
    }

    pub fn with_depends(mut self, depends: impl IntoIterator<Item = TaskId>) -> Self {
        self.task.depends = depends.into_iter().collect();
        self
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = &'static str>) -> Self {
        self.task.labels = labels.into_iter().map(String::from).collect();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.task.created_at = created_at;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

pub struct NewTaskBuilder {
    new_task: cleo_core::models::NewTask,
}

impl Default for NewTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewTaskBuilder {
    pub fn new() -> Self {
        Self { new_task: cleo_core::models::NewTask { title: "New task".into(), ..Default::default() } }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.new_task.title = title.into();
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.new_task.task_type = task_type;
        self
    }

    pub fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.new_task.parent_id = Some(parent_id);
        self
    }

    pub fn with_depends(mut self, depends: impl IntoIterator<Item = TaskId>) -> Self {
        self.new_task.depends = depends.into_iter().collect();
        self
    }

    pub fn with_size(mut self, size: TaskSize) -> Self {
        self.new_task.size = Some(size);
        self
    }

    pub fn build(self) -> cleo_core::models::NewTask {
        self.new_task
    }
}

#[derive(Default)]
pub struct UpdateTaskBuilder {
    update: UpdateTask,
}

impl UpdateTaskBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.update.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.update.description = Some(Some(description.into()));
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.update.priority = Some(priority);
        self
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = &'static str>) -> Self {
        self.update.labels = Some(labels.into_iter().map(String::from).collect());
        self
    }

    pub fn build(self) -> UpdateTask {
        self.update
    }
}

#[derive(Default)]
pub struct TaskFilterBuilder {
    filter: TaskFilter,
}

impl TaskFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.filter.status = Some(status);
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.filter.task_type = Some(task_type);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.filter.label = Some(label.into());
        self
    }

    pub fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.filter.parent_id = Some(parent_id);
        self
    }

    pub fn build(self) -> TaskFilter {
        self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_builder_applies_overrides_on_top_of_defaults() {
        let task = TaskBuilder::new().with_id(7).with_title("Ship it").with_status(TaskStatus::Done).build();
        assert_eq!(task.id, TaskId::new(7));
        assert_eq!(task.title, "Ship it");
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn new_task_builder_defaults_to_task_type() {
        let new_task = NewTaskBuilder::new().build();
        assert_eq!(new_task.task_type, TaskType::Task);
    }
}
