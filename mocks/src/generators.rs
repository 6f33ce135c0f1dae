// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random/property-based data generators over CLEO's task types.

use chrono::Utc;
use cleo_core::models::{Priority, Task, TaskFilter, TaskId, TaskStatus, TaskType};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use proptest::prelude::*;
use rand::Rng;

pub fn generate_task_title() -> String {
    Sentence(3..8).fake()
}

pub fn generate_agent_name() -> String {
    let agents = ["rust-architect", "graph-engineer", "protocol-specialist", "integration-lead", "testing-expert"];
    agents[rand::thread_rng().gen_range(0..agents.len())].to_string()
}

pub fn generate_random_status() -> TaskStatus {
    let statuses = [TaskStatus::Pending, TaskStatus::Active, TaskStatus::Blocked, TaskStatus::Done, TaskStatus::Cancelled];
    statuses[rand::thread_rng().gen_range(0..statuses.len())]
}

pub fn generate_random_task() -> Task {
    let id: u64 = (1..99_999u32).fake::<u32>() as u64;
    let mut task = Task::new(TaskId::new(id), generate_task_title(), TaskType::Task, Utc::now());
    task.status = generate_random_status();
    if task.status == TaskStatus::Done {
        task.completed_at = Some(Utc::now());
    }
    task
}

/// Configurable generator for bulk fixture generation.
pub struct TaskGenerator {
    pub next_id: u64,
}

impl Default for TaskGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGenerator {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn generate(&mut self) -> Task {
        let id = self.next_id;
        self.next_id += 1;
        let mut task = Task::new(TaskId::new(id), generate_task_title(), TaskType::Task, Utc::now());
        task.status = generate_random_status();
        task
    }
}

pub fn task_status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::Active),
        Just(TaskStatus::Blocked),
        Just(TaskStatus::Done),
        Just(TaskStatus::Cancelled),
    ]
}

pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High), Just(Priority::Critical)]
}

/// Strategy over well-formed tasks, `completed_at` set iff `status == Done`.
pub fn task_strategy() -> impl Strategy<Value = Task> {
    (1u64..99_999, "[A-Za-z ]{5,50}", task_status_strategy(), priority_strategy()).prop_map(
        |(id, title, status, priority)| {
            let mut task = Task::new(TaskId::new(id), title, TaskType::Task, Utc::now());
            task.status = status;
            task.priority = priority;
            if status == TaskStatus::Done {
                task.completed_at = Some(Utc::now());
            }
            task
        },
    )
}

pub fn task_filter_strategy() -> impl Strategy<Value = TaskFilter> {
    (proptest::option::of(task_status_strategy()), proptest::option::of(priority_strategy()))
        .prop_map(|(status, priority)| TaskFilter { status, priority, ..Default::default() })
}
