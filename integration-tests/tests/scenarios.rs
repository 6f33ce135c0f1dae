// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against the public operation surface, one test per
//! literal example under the "concrete end-to-end scenarios" list.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use cleo_core::accessor::DataAccessor;
use cleo_core::config::Config;
use cleo_core::models::{ChildStrategy, NewTask, Scope, TaskId, TaskType, VerificationGate};
use cleo_core::ops::{execute, OpContext, Operation};
use cleo_core::{graph, CleoError};
use cleo_storage::FileAccessor;

fn ctx<'a>(accessor: &'a dyn DataAccessor, config: &'a Config, actor: &str) -> OpContext<'a> {
    OpContext { accessor, config, now: Utc::now(), actor: actor.to_string() }
}

async fn new_project() -> (tempfile::TempDir, Arc<dyn DataAccessor>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let accessor: Arc<dyn DataAccessor> = Arc::new(FileAccessor::new(dir.path()));
    (dir, accessor)
}

fn new_task(title: &str, task_type: TaskType, parent: Option<TaskId>, depends: &[TaskId]) -> NewTask {
    NewTask {
        title: title.to_string(),
        task_type,
        parent_id: parent,
        depends: depends.iter().copied().collect(),
        ..Default::default()
    }
}

fn task_id_of(value: &serde_json::Value) -> TaskId {
    serde_json::from_value(value["id"].clone()).expect("task id")
}

#[tokio::test]
async fn epic_decomposition_and_wave_computation() {
    let (_dir, accessor) = new_project().await;
    let config = Config::default();
    let c = ctx(accessor.as_ref(), &config, "alpha");

    let epic = execute(Operation::Add(new_task("Epic", TaskType::Epic, None, &[])), &c).await.unwrap();
    let epic_id = task_id_of(&epic);

    let a = execute(Operation::Add(new_task("A", TaskType::Task, Some(epic_id), &[])), &c).await.unwrap();
    let a_id = task_id_of(&a);
    let b = execute(Operation::Add(new_task("B", TaskType::Task, Some(epic_id), &[])), &c).await.unwrap();
    let b_id = task_id_of(&b);
    execute(Operation::Add(new_task("C", TaskType::Task, Some(epic_id), &[a_id, b_id])), &c).await.unwrap();

    let doc = accessor.load_todo().await.unwrap();
    let subtree: HashMap<TaskId, _> =
        graph::subtree(&doc.tasks.iter().map(|(k, v)| (*k, v.clone())).collect(), epic_id)
            .into_iter()
            .filter(|(id, _)| *id != epic_id)
            .collect();
    let waves = graph::compute_waves(&subtree);
    assert_eq!(waves.len(), 2);
    assert_eq!(waves[0], vec![a_id, b_id]);

    let next = cleo_core::orchestrator::next(&doc.tasks, epic_id, cleo_core::graph::SizeStrategy::Balanced, None);
    assert_eq!(next, Some(a_id));
}

#[tokio::test]
async fn auto_complete_propagation() {
    let (_dir, accessor) = new_project().await;
    let config = Config::default();
    let c = ctx(accessor.as_ref(), &config, "alpha");

    let epic = execute(Operation::Add(new_task("Epic", TaskType::Epic, None, &[])), &c).await.unwrap();
    let epic_id = task_id_of(&epic);
    let a = execute(Operation::Add(new_task("A", TaskType::Task, Some(epic_id), &[])), &c).await.unwrap();
    let a_id = task_id_of(&a);
    let b = execute(Operation::Add(new_task("B", TaskType::Task, Some(epic_id), &[])), &c).await.unwrap();
    let b_id = task_id_of(&b);
    let c_task = execute(Operation::Add(new_task("C", TaskType::Task, Some(epic_id), &[a_id, b_id])), &c).await.unwrap();
    let c_id = task_id_of(&c_task);

    execute(Operation::Complete(a_id), &c).await.unwrap();
    execute(Operation::Complete(b_id), &c).await.unwrap();
    let outcome = execute(Operation::Complete(c_id), &c).await.unwrap();
    let ancestors: Vec<TaskId> = serde_json::from_value(outcome["autoCompletedAncestors"].clone()).unwrap();
    assert!(ancestors.contains(&epic_id));

    let doc = accessor.load_todo().await.unwrap();
    assert_eq!(doc.tasks[&epic_id].status, cleo_core::models::TaskStatus::Done);
    assert!(doc.tasks[&epic_id].completed_at.is_some());

    let reopen = execute(Operation::Reopen(c_id), &c).await.unwrap();
    let reopened: Vec<TaskId> = serde_json::from_value(reopen["autoReopenedAncestors"].clone()).unwrap();
    assert!(reopened.contains(&epic_id));
    let doc = accessor.load_todo().await.unwrap();
    assert_eq!(doc.tasks[&c_id].status, cleo_core::models::TaskStatus::Pending);
    assert_eq!(doc.tasks[&epic_id].status, cleo_core::models::TaskStatus::Pending);
}

#[tokio::test]
async fn cancel_with_cascade_threshold() {
    let (_dir, accessor) = new_project().await;
    let mut config = Config::default();
    config.cascade_threshold = 10;
    let c = ctx(accessor.as_ref(), &config, "alpha");

    let epic = execute(Operation::Add(new_task("Epic", TaskType::Epic, None, &[])), &c).await.unwrap();
    let epic_id = task_id_of(&epic);
    for i in 0..15 {
        execute(Operation::Add(new_task(&format!("Child {i}"), TaskType::Task, Some(epic_id), &[])), &c).await.unwrap();
    }

    let log_before = accessor.load_todo().await.unwrap();
    let before_count = log_before.tasks.len();

    let err = execute(
        Operation::Cancel { id: epic_id, reason: "scope cut".into(), strategy: ChildStrategy::Cascade, force: false },
        &c,
    )
    .await
    .unwrap_err();
    match err {
        CleoError::CascadeThresholdExceeded { affected, threshold } => {
            assert_eq!(affected, 15);
            assert_eq!(threshold, 10);
        }
        other => panic!("expected CascadeThresholdExceeded, got {other:?}"),
    }

    let unchanged = accessor.load_todo().await.unwrap();
    assert_eq!(unchanged.tasks.len(), before_count);

    execute(
        Operation::Cancel { id: epic_id, reason: "scope cut".into(), strategy: ChildStrategy::Cascade, force: true },
        &c,
    )
    .await
    .unwrap();

    let after = accessor.load_todo().await.unwrap();
    assert!(after.tasks.values().all(|t| t.status == cleo_core::models::TaskStatus::Cancelled));
}

#[tokio::test]
async fn circular_validation_prevention() {
    let (_dir, accessor) = new_project().await;
    let config = Config::default();
    let c = ctx(accessor.as_ref(), &config, "alpha");

    let t100 = execute(Operation::Add(new_task("Feature", TaskType::Task, None, &[])), &c).await.unwrap();
    let t100_id = task_id_of(&t100);

    let err = execute(
        Operation::SetGate {
            id: t100_id,
            gate: VerificationGate::TestsPassed,
            value: Some(true),
            agent: "alpha".into(),
            creator: "alpha".into(),
        },
        &c,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CleoError::CircularValidation(_)));

    execute(
        Operation::SetGate {
            id: t100_id,
            gate: VerificationGate::TestsPassed,
            value: Some(true),
            agent: "beta".into(),
            creator: "alpha".into(),
        },
        &c,
    )
    .await
    .unwrap();

    let err = execute(
        Operation::SetGate {
            id: t100_id,
            gate: VerificationGate::QaPassed,
            value: Some(true),
            agent: "beta".into(),
            creator: "alpha".into(),
        },
        &c,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CleoError::CircularValidation(_)));
}

#[tokio::test]
async fn dependency_wave_under_partial_completion() {
    let (_dir, accessor) = new_project().await;
    let config = Config::default();
    let c = ctx(accessor.as_ref(), &config, "alpha");

    let t1 = execute(Operation::Add(new_task("T1", TaskType::Task, None, &[])), &c).await.unwrap();
    let t1_id = task_id_of(&t1);
    let t2 = execute(Operation::Add(new_task("T2", TaskType::Task, None, &[t1_id])), &c).await.unwrap();
    let t2_id = task_id_of(&t2);
    let t3 = execute(Operation::Add(new_task("T3", TaskType::Task, None, &[t1_id])), &c).await.unwrap();
    let t3_id = task_id_of(&t3);
    execute(Operation::Add(new_task("T4", TaskType::Task, None, &[t2_id, t3_id])), &c).await.unwrap();

    execute(Operation::Complete(t1_id), &c).await.unwrap();
    let waves = execute(Operation::Waves, &c).await.unwrap();
    let waves: Vec<Vec<TaskId>> = serde_json::from_value(waves).unwrap();
    assert_eq!(waves[0], vec![t2_id, t3_id]);

    execute(Operation::Complete(t2_id), &c).await.unwrap();
    let waves = execute(Operation::Waves, &c).await.unwrap();
    let waves: Vec<Vec<TaskId>> = serde_json::from_value(waves).unwrap();
    assert_eq!(waves[0], vec![t3_id]);
}

#[tokio::test]
async fn session_conflict() {
    let (_dir, accessor) = new_project().await;
    let config = Config::default();
    let c = ctx(accessor.as_ref(), &config, "alpha");

    let epic = execute(Operation::Add(new_task("Epic", TaskType::Epic, None, &[])), &c).await.unwrap();
    let epic_id = task_id_of(&epic);

    execute(
        Operation::SessionStart {
            name: "s1".into(),
            scope: Scope::Epic { epic_id },
            agent: Some("alpha".into()),
            id_suffix_hex: "aaaa".into(),
        },
        &c,
    )
    .await
    .unwrap();

    let err = execute(
        Operation::SessionStart {
            name: "s2".into(),
            scope: Scope::Epic { epic_id },
            agent: Some("alpha".into()),
            id_suffix_hex: "bbbb".into(),
        },
        &c,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CleoError::StateConflict(_)));

    execute(
        Operation::SessionStart { name: "s3".into(), scope: Scope::Global, agent: Some("alpha".into()), id_suffix_hex: "cccc".into() },
        &c,
    )
    .await
    .unwrap();
}
