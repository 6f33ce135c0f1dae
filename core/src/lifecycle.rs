// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lifecycle operations.
//!
//! Every function here is pure: `(state, request) -> (state, outcome)`.
//! Callers ([`ops`](crate::ops)) are responsible for loading state through
//! a [`DataAccessor`](crate::accessor::DataAccessor) beforehand and saving
//! it plus an [`AuditEntry`](crate::audit::AuditEntry) afterward.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::{
    config::Config,
    error::{CleoError, Result},
    models::{ChildStrategy, NewTask, Task, TaskId, TaskStatus, UpdateTask},
    validation::Validator,
};

/// Bridges to the `HashMap`-keyed helpers in [`crate::graph`].
fn as_hashmap(active: &BTreeMap<TaskId, Task>) -> HashMap<TaskId, Task> {
    active.iter().map(|(k, v)| (*k, v.clone())).collect()
}

/// Picks `T` + (1 + max existing numeric suffix) across active and
/// archived tasks.
pub fn next_task_id(active: &BTreeMap<TaskId, Task>, archived: &BTreeMap<TaskId, Task>) -> TaskId {
    let max = active
        .keys()
        .chain(archived.keys())
        .map(|id| id.numeric())
        .max()
        .unwrap_or(0);
    TaskId::new(max + 1)
}

pub fn add(
    active: &mut BTreeMap<TaskId, Task>,
    archived: &BTreeMap<TaskId, Task>,
    new_task: NewTask,
    validator: &Validator,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<Task> {
    validator.validate_title(&new_task.title)?;
    if let Some(desc) = &new_task.description {
        validator.validate_description(desc)?;
    }
    if let Some(parent) = new_task.parent_id {
        if !active.contains_key(&parent) {
            return Err(CleoError::not_found(parent));
        }
    }
    for dep in &new_task.depends {
        if !active.contains_key(dep) {
            return Err(CleoError::not_found(*dep));
        }
    }

    let id = next_task_id(active, archived);
    let mut task = Task::new(id, new_task.title, new_task.task_type, now);
    task.description = new_task.description;
    task.priority = new_task.priority.unwrap_or_default();
    task.parent_id = new_task.parent_id;
    task.depends = new_task.depends;
    task.labels = new_task
        .labels
        .into_iter()
        .map(|l| Validator::normalize_label(&l))
        .collect::<Result<_>>()?;
    task.phase = new_task.phase;
    task.size = new_task.size;
    task.files = new_task.files;

    active.insert(id, task.clone());

    let depth = crate::graph::depth_of(&as_hashmap(active), id);
    if depth > config.max_hierarchy_depth {
        active.remove(&id);
        return Err(CleoError::validation(format!(
            "{id} is at depth {depth}, max is {}",
            config.max_hierarchy_depth
        )));
    }
    if crate::graph::dependency_graph_has_cycle(&as_hashmap(active)) {
        active.remove(&id);
        return Err(CleoError::validation("adding this task would create a dependency cycle"));
    }

    Ok(task)
}

pub fn update(
    active: &mut BTreeMap<TaskId, Task>,
    id: TaskId,
    changes: UpdateTask,
    validator: &Validator,
    now: DateTime<Utc>,
) -> Result<Task> {
    if let Some(title) = &changes.title {
        validator.validate_title(title)?;
    }
    if let Some(Some(desc)) = &changes.description {
        validator.validate_description(desc)?;
    }

    let task = active.get_mut(&id).ok_or_else(|| CleoError::not_found(id))?;
    if let Some(title) = changes.title {
        task.title = title;
    }
    if let Some(description) = changes.description {
        task.description = description;
    }
    if let Some(priority) = changes.priority {
        task.priority = priority;
    }
    if let Some(parent_id) = changes.parent_id {
        task.parent_id = parent_id;
    }
    if let Some(depends) = changes.depends {
        task.depends = depends;
    }
    if let Some(labels) = changes.labels {
        task.labels = labels
            .into_iter()
            .map(|l| Validator::normalize_label(&l))
            .collect::<Result<_>>()?;
    }
    if let Some(phase) = changes.phase {
        task.phase = phase;
    }
    if let Some(size) = changes.size {
        task.size = size;
    }
    if let Some(files) = changes.files {
        task.files = files;
    }
    if let Some(agent_context) = changes.agent_context {
        task.agent_context = agent_context;
    }
    task.updated_at = now;

    let active_map = as_hashmap(active);
    if crate::graph::dependency_graph_has_cycle(&active_map) || crate::graph::parent_chain_has_cycle(&active_map) {
        return Err(CleoError::validation("update would introduce a cycle"));
    }

    Ok(active[&id].clone())
}

/// Walks parents bottom-up, auto-completing any parent whose children are
/// all `done`. Returns the ids that were auto-completed, in order.
fn propagate_auto_complete(active: &mut BTreeMap<TaskId, Task>, start: TaskId, now: DateTime<Utc>) -> Vec<TaskId> {
    let mut completed = Vec::new();
    let mut current = start;
    loop {
        let Some(parent_id) = active.get(&current).and_then(|t| t.parent_id) else {
            break;
        };
        let children_all_done = active
            .values()
            .filter(|t| t.parent_id == Some(parent_id))
            .all(|t| t.status == TaskStatus::Done);
        if !children_all_done {
            break;
        }
        let Some(parent) = active.get_mut(&parent_id) else {
            break;
        };
        if parent.status == TaskStatus::Done {
            break;
        }
        parent.status = TaskStatus::Done;
        parent.completed_at = Some(now);
        parent.updated_at = now;
        completed.push(parent_id);
        current = parent_id;
    }
    completed
}

/// Inverse of [`propagate_auto_complete`]: cascades reopening to ancestors
/// that were previously auto-completed.
fn propagate_auto_reopen(active: &mut BTreeMap<TaskId, Task>, start: TaskId, now: DateTime<Utc>) -> Vec<TaskId> {
    let mut reopened = Vec::new();
    let mut current = start;
    loop {
        let Some(parent_id) = active.get(&current).and_then(|t| t.parent_id) else {
            break;
        };
        let Some(parent) = active.get_mut(&parent_id) else {
            break;
        };
        if parent.status != TaskStatus::Done {
            break;
        }
        parent.status = TaskStatus::Pending;
        parent.completed_at = None;
        parent.updated_at = now;
        reopened.push(parent_id);
        current = parent_id;
    }
    reopened
}

pub struct CompleteOutcome {
    pub task: Task,
    pub auto_completed_ancestors: Vec<TaskId>,
}

pub fn complete(
    active: &mut BTreeMap<TaskId, Task>,
    id: TaskId,
    validator: &Validator,
    now: DateTime<Utc>,
) -> Result<CompleteOutcome> {
    let current_status = active.get(&id).ok_or_else(|| CleoError::not_found(id))?.status;
    validator.validate_state_transition(current_status, TaskStatus::Done)?;

    let task = active.get_mut(&id).unwrap();
    task.status = TaskStatus::Done;
    task.completed_at = Some(now);
    task.updated_at = now;
    let task_out = task.clone();

    let ancestors = propagate_auto_complete(active, id, now);

    Ok(CompleteOutcome {
        task: task_out,
        auto_completed_ancestors: ancestors,
    })
}

pub struct ReopenOutcome {
    pub task: Task,
    pub auto_reopened_ancestors: Vec<TaskId>,
}

pub fn reopen(
    active: &mut BTreeMap<TaskId, Task>,
    id: TaskId,
    validator: &Validator,
    now: DateTime<Utc>,
) -> Result<ReopenOutcome> {
    let current_status = active.get(&id).ok_or_else(|| CleoError::not_found(id))?.status;
    validator.validate_state_transition(current_status, TaskStatus::Pending)?;

    let task = active.get_mut(&id).unwrap();
    task.status = TaskStatus::Pending;
    task.completed_at = None;
    task.updated_at = now;
    let task_out = task.clone();

    let ancestors = propagate_auto_reopen(active, id, now);

    Ok(ReopenOutcome {
        task: task_out,
        auto_reopened_ancestors: ancestors,
    })
}

fn direct_children(active: &BTreeMap<TaskId, Task>, parent: TaskId) -> Vec<TaskId> {
    active
        .values()
        .filter(|t| t.parent_id == Some(parent))
        .map(|t| t.id)
        .collect()
}

#[derive(Debug)]
pub struct CancelOutcome {
    pub affected: Vec<TaskId>,
}

pub fn cancel(
    active: &mut BTreeMap<TaskId, Task>,
    id: TaskId,
    reason: &str,
    strategy: ChildStrategy,
    force: bool,
    validator: &Validator,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<CancelOutcome> {
    validator.validate_reason(reason)?;
    if !active.contains_key(&id) {
        return Err(CleoError::not_found(id));
    }

    let descendants = crate::graph::descendants_of(&as_hashmap(active), id);
    let children = direct_children(active, id);

    match strategy {
        ChildStrategy::Block => {
            if !children.is_empty() {
                return Err(CleoError::StateConflict(format!(
                    "{id} has {} children; cancel them first or choose a child strategy",
                    children.len()
                )));
            }
        }
        ChildStrategy::Cascade => {
            if descendants.len() > config.cascade_threshold && !force {
                return Err(CleoError::CascadeThresholdExceeded {
                    affected: descendants.len(),
                    threshold: config.cascade_threshold,
                });
            }
        }
        ChildStrategy::Orphan => {}
    }

    let mut affected = vec![id];
    let task = active.get_mut(&id).unwrap();
    task.status = TaskStatus::Cancelled;
    task.cancellation_reason = Some(reason.to_string());
    task.cancelled_at = Some(now);
    task.updated_at = now;

    match strategy {
        ChildStrategy::Cascade => {
            for desc_id in &descendants {
                if let Some(t) = active.get_mut(desc_id) {
                    t.status = TaskStatus::Cancelled;
                    t.cancellation_reason = Some(reason.to_string());
                    t.cancelled_at = Some(now);
                    t.updated_at = now;
                    affected.push(*desc_id);
                }
            }
        }
        ChildStrategy::Orphan => {
            for child_id in children {
                if let Some(t) = active.get_mut(&child_id) {
                    t.parent_id = None;
                    t.updated_at = now;
                }
            }
        }
        ChildStrategy::Block => {}
    }

    Ok(CancelOutcome { affected })
}

pub fn uncancel(active: &mut BTreeMap<TaskId, Task>, id: TaskId, now: DateTime<Utc>) -> Result<Task> {
    let task = active.get_mut(&id).ok_or_else(|| CleoError::not_found(id))?;
    if task.status != TaskStatus::Cancelled {
        return Err(CleoError::invalid_transition(task.status, TaskStatus::Pending));
    }
    task.status = TaskStatus::Pending;
    task.cancellation_reason = None;
    task.cancelled_at = None;
    task.updated_at = now;
    Ok(task.clone())
}

pub fn delete(
    active: &mut BTreeMap<TaskId, Task>,
    id: TaskId,
    strategy: ChildStrategy,
    force: bool,
    config: &Config,
) -> Result<Vec<TaskId>> {
    if !active.contains_key(&id) {
        return Err(CleoError::not_found(id));
    }
    let descendants = crate::graph::descendants_of(&as_hashmap(active), id);
    let children = direct_children(active, id);

    match strategy {
        ChildStrategy::Block if !children.is_empty() => {
            return Err(CleoError::StateConflict(format!(
                "{id} has {} children; delete them first or choose a child strategy",
                children.len()
            )));
        }
        ChildStrategy::Cascade if descendants.len() > config.cascade_threshold && !force => {
            return Err(CleoError::CascadeThresholdExceeded {
                affected: descendants.len(),
                threshold: config.cascade_threshold,
            });
        }
        ChildStrategy::Orphan => {
            for child_id in &children {
                if let Some(t) = active.get_mut(child_id) {
                    t.parent_id = None;
                }
            }
        }
        _ => {}
    }

    let mut removed = vec![id];
    active.remove(&id);
    if strategy == ChildStrategy::Cascade {
        for desc_id in descendants {
            active.remove(&desc_id);
            removed.push(desc_id);
        }
    }
    Ok(removed)
}

/// Verification gate write. `agent` is the writer; `creator` is the
/// task's original author for circular-validation purposes.
pub fn set_gate(
    task: &mut Task,
    gate: crate::models::VerificationGate,
    value: Option<bool>,
    agent: &str,
    creator: &str,
    validator: &Validator,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let previous_agent = gate.predecessor().and_then(|p| task.verification.gate_agents.get(&p).cloned());
    validator.validate_not_circular(creator, previous_agent.as_deref(), agent)?;

    if value == Some(true) {
        if let Some(pred) = gate.predecessor() {
            if task.verification.gates.get(&pred).copied().flatten() != Some(true) {
                return Err(CleoError::validation(format!(
                    "predecessor gate {pred:?} must pass before {gate:?}"
                )));
            }
        }
        task.verification.gates.insert(gate, Some(true));
        task.verification.gate_agents.insert(gate, agent.to_string());
    } else if value == Some(false) {
        let idx = gate.index();
        for g in crate::models::GATE_CHAIN.iter().skip(idx) {
            task.verification.gates.insert(*g, None);
        }
        task.verification.round += 1;
        if task.verification.round > config.max_verification_rounds {
            return Err(CleoError::LifecycleGateBlocked(format!(
                "{} has exceeded {} verification rounds",
                task.id, config.max_verification_rounds
            )));
        }
        task.verification.failures.push(crate::models::VerificationFailure {
            gate,
            agent: agent.to_string(),
            reason: "gate reset to false".to_string(),
            timestamp: now,
            round: task.verification.round,
        });
    } else {
        task.verification.gates.insert(gate, None);
    }
    task.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskType;

    fn validator() -> Validator {
        Validator::default()
    }

    #[test]
    fn next_id_skips_archived_ids() {
        let mut active = BTreeMap::new();
        active.insert(TaskId::new(1), Task::new(TaskId::new(1), "a".into(), TaskType::Task, Utc::now()));
        let mut archived = BTreeMap::new();
        archived.insert(TaskId::new(5), Task::new(TaskId::new(5), "b".into(), TaskType::Task, Utc::now()));
        assert_eq!(next_task_id(&active, &archived), TaskId::new(6));
    }

    #[test]
    fn epic_decomposition_scenario() {
        let mut active = BTreeMap::new();
        let archived = BTreeMap::new();
        let v = validator();
        let config = Config::default();
        let now = Utc::now();

        let epic = add(&mut active, &archived, NewTask { title: "Epic".into(), task_type: TaskType::Epic, ..Default::default() }, &v, &config, now).unwrap();
        let a = add(&mut active, &archived, NewTask { title: "A".into(), parent_id: Some(epic.id), ..Default::default() }, &v, &config, now).unwrap();
        let b = add(&mut active, &archived, NewTask { title: "B".into(), parent_id: Some(epic.id), ..Default::default() }, &v, &config, now).unwrap();
        let mut c_new = NewTask { title: "C".into(), parent_id: Some(epic.id), ..Default::default() };
        c_new.depends.insert(a.id);
        c_new.depends.insert(b.id);
        let c = add(&mut active, &archived, c_new, &v, &config, now).unwrap();

        assert_eq!(epic.id, TaskId::new(1));
        assert_eq!(a.id, TaskId::new(2));
        assert_eq!(b.id, TaskId::new(3));
        assert_eq!(c.id, TaskId::new(4));

        let waves = crate::graph::compute_waves(&as_hashmap(&active));
        assert_eq!(waves, vec![vec![a.id, b.id], vec![c.id]]);
    }

    #[test]
    fn auto_complete_propagates_to_parent_and_reopen_reverses_it() {
        let mut active = BTreeMap::new();
        let archived = BTreeMap::new();
        let v = validator();
        let config = Config::default();
        let now = Utc::now();

        let epic = add(&mut active, &archived, NewTask { title: "Epic".into(), task_type: TaskType::Epic, ..Default::default() }, &v, &config, now).unwrap();
        let only_child = add(&mut active, &archived, NewTask { title: "Child".into(), parent_id: Some(epic.id), ..Default::default() }, &v, &config, now).unwrap();

        active.get_mut(&only_child.id).unwrap().status = TaskStatus::Active;
        let outcome = complete(&mut active, only_child.id, &v, now).unwrap();
        assert_eq!(outcome.auto_completed_ancestors, vec![epic.id]);
        assert_eq!(active[&epic.id].status, TaskStatus::Done);

        let reopened = reopen(&mut active, only_child.id, &v, now).unwrap();
        assert_eq!(reopened.auto_reopened_ancestors, vec![epic.id]);
        assert_eq!(active[&epic.id].status, TaskStatus::Pending);
    }

    #[test]
    fn cancel_cascade_over_threshold_without_force_is_rejected() {
        let mut active = BTreeMap::new();
        let archived = BTreeMap::new();
        let v = validator();
        let mut config = Config::default();
        config.cascade_threshold = 1;
        let now = Utc::now();

        let epic = add(&mut active, &archived, NewTask { title: "Epic".into(), task_type: TaskType::Epic, ..Default::default() }, &v, &config, now).unwrap();
        for i in 0..3 {
            add(&mut active, &archived, NewTask { title: format!("child{i}"), parent_id: Some(epic.id), ..Default::default() }, &v, &config, now).unwrap();
        }

        let err = cancel(&mut active, epic.id, "no longer needed", ChildStrategy::Cascade, false, &v, &config, now).unwrap_err();
        assert!(matches!(err, CleoError::CascadeThresholdExceeded { affected: 3, threshold: 1 }));

        let ok = cancel(&mut active, epic.id, "no longer needed", ChildStrategy::Cascade, true, &v, &config, now).unwrap();
        assert_eq!(ok.affected.len(), 4);
    }

    #[test]
    fn gate_write_requires_predecessor_and_blocks_circular_validation() {
        let mut task = Task::new(TaskId::new(1), "t".into(), TaskType::Task, Utc::now());
        let v = validator();
        let config = Config::default();
        let now = Utc::now();

        let err = set_gate(&mut task, crate::models::VerificationGate::TestsPassed, Some(true), "beta", "alpha", &v, &config, now).unwrap_err();
        assert!(err.is_validation());

        set_gate(&mut task, crate::models::VerificationGate::Implemented, Some(true), "beta", "alpha", &v, &config, now).unwrap();
        set_gate(&mut task, crate::models::VerificationGate::TestsPassed, Some(true), "beta", "alpha", &v, &config, now).unwrap();

        let err = set_gate(&mut task, crate::models::VerificationGate::QaPassed, Some(true), "alpha", "alpha", &v, &config, now).unwrap_err();
        assert!(matches!(err, CleoError::CircularValidation(_)));
    }
}
