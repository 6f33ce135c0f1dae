// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task graph algorithms.
//!
//! Everything here is a pure function over an in-memory snapshot of the
//! active task list: no I/O, no locking, no mutation. `cleo-core::lifecycle`
//! and `cleo-core::ops` call into this module after loading state through
//! the data accessor.

use crate::models::{Priority, Task, TaskId, TaskStatus, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::Critical => 0,
        Priority::High => 1,
        Priority::Medium => 2,
        Priority::Low => 3,
    }
}

/// An edge is "satisfied" if its target is done or cancelled.
fn dep_satisfied(tasks: &HashMap<TaskId, Task>, dep: TaskId) -> bool {
    tasks
        .get(&dep)
        .map(|t| t.status.is_terminal())
        .unwrap_or(true) // a dangling dependency can't block forever
}

/// Kahn's algorithm over `depends`. On a cycle, falls back to a
/// priority-then-id ordering over whatever remains unresolved, so the
/// algorithm is total even over invalid state (cycle detection itself is
/// a validation-layer concern).
pub fn topological_sort(tasks: &HashMap<TaskId, Task>) -> Vec<TaskId> {
    let mut in_degree: HashMap<TaskId, usize> = HashMap::new();
    let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();

    for task in tasks.values() {
        in_degree.entry(task.id).or_insert(0);
        for dep in &task.depends {
            if tasks.contains_key(dep) {
                *in_degree.entry(task.id).or_insert(0) += 1;
                dependents.entry(*dep).or_default().push(task.id);
            }
        }
    }

    let mut queue: VecDeque<TaskId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    queue.make_contiguous().sort();

    let mut order = Vec::with_capacity(tasks.len());
    let mut remaining = in_degree.clone();

    while let Some(id) = queue.pop_front() {
        order.push(id);
        if let Some(deps) = dependents.get(&id) {
            let mut newly_ready = Vec::new();
            for d in deps {
                if let Some(v) = remaining.get_mut(d) {
                    *v -= 1;
                    if *v == 0 {
                        newly_ready.push(*d);
                    }
                }
            }
            newly_ready.sort();
            for d in newly_ready {
                queue.push_back(d);
            }
        }
    }

    if order.len() < tasks.len() {
        // Cycle: append the rest sorted by priority then id.
        let done: HashSet<TaskId> = order.iter().copied().collect();
        let mut rest: Vec<TaskId> = tasks.keys().filter(|id| !done.contains(*id)).copied().collect();
        rest.sort_by_key(|id| (priority_rank(tasks[id].priority), *id));
        order.extend(rest);
    }

    order
}

/// Dependency waves. Only active tasks participate; edges to
/// done/cancelled tasks are already satisfied.
pub fn compute_waves(tasks: &HashMap<TaskId, Task>) -> Vec<Vec<TaskId>> {
    let active: HashMap<TaskId, &Task> = tasks
        .iter()
        .filter(|(_, t)| !t.status.is_terminal())
        .map(|(id, t)| (*id, t))
        .collect();

    let mut remaining: HashSet<TaskId> = active.keys().copied().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
        let mut wave: Vec<TaskId> = remaining
            .iter()
            .copied()
            .filter(|id| {
                active[id]
                    .depends
                    .iter()
                    .all(|dep| !remaining.contains(dep) && dep_satisfied(tasks, *dep))
            })
            .collect();
        wave.sort();

        if wave.is_empty() {
            // Stalled: cyclic remainder becomes one final wave.
            let mut rest: Vec<TaskId> = remaining.iter().copied().collect();
            rest.sort();
            waves.push(rest);
            break;
        }

        for id in &wave {
            remaining.remove(id);
        }
        waves.push(wave);
    }

    waves
}

/// Next task to work: active tasks whose active deps are all done/cancelled,
/// already-active tasks continue first, then priority, then id.
pub fn next_task(tasks: &HashMap<TaskId, Task>) -> Option<TaskId> {
    let mut candidates: Vec<&Task> = tasks
        .values()
        .filter(|t| !t.status.is_terminal())
        .filter(|t| t.depends.iter().all(|d| dep_satisfied(tasks, *d)))
        .collect();

    candidates.sort_by_key(|t| {
        (
            if t.status == TaskStatus::Active { 0 } else { 1 },
            priority_rank(t.priority),
            t.id,
        )
    });

    candidates.first().map(|t| t.id)
}

/// Longest-chain distance via DP on the topological order. Ties break
/// toward the highest in-id order (a later id wins a tie).
pub fn critical_path(tasks: &HashMap<TaskId, Task>) -> Vec<TaskId> {
    let order = topological_sort(tasks);
    let mut dist: HashMap<TaskId, u32> = HashMap::new();
    let mut prev: HashMap<TaskId, Option<TaskId>> = HashMap::new();

    for id in &order {
        let task = &tasks[id];
        let mut best = (0u32, None::<TaskId>);
        for dep in &task.depends {
            if let Some(d) = dist.get(dep) {
                let candidate = *d + 1;
                if candidate > best.0 || (candidate == best.0 && Some(*dep) > best.1) {
                    best = (candidate, Some(*dep));
                }
            }
        }
        dist.insert(*id, best.0);
        prev.insert(*id, best.1);
    }

    let Some(&end) = dist
        .iter()
        .max_by_key(|(id, d)| (**d, **id))
        .map(|(id, _)| id)
    else {
        return Vec::new();
    };

    let mut chain = vec![end];
    let mut cur = end;
    while let Some(Some(p)) = prev.get(&cur) {
        chain.push(*p);
        cur = *p;
    }
    chain.reverse();
    chain
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeStrategy {
    QuickWins,
    BigImpact,
    Balanced,
}

fn size_weight(strategy: SizeStrategy, size: Option<crate::models::TaskSize>) -> f64 {
    use crate::models::TaskSize::*;
    let (small, medium, large) = match strategy {
        SizeStrategy::QuickWins => (3.0, 2.0, 1.0),
        SizeStrategy::BigImpact => (1.0, 2.0, 3.0),
        SizeStrategy::Balanced => (1.0, 1.0, 1.0),
    };
    match size {
        Some(Small) => small,
        Some(Medium) => medium,
        Some(Large) => large,
        None => medium,
    }
}

fn phase_boost(priority: Priority, task_phase: Option<&str>, current_phase: Option<&str>) -> f64 {
    let base = match priority {
        Priority::Critical | Priority::High => 1.0,
        _ => 0.0,
    };
    if base == 0.0 {
        return 1.0;
    }
    match (task_phase, current_phase) {
        (Some(tp), Some(cp)) if tp == cp => 1.5,
        (Some(_), Some(_)) => 1.25,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeverageRecommendation {
    pub task_id: TaskId,
    pub leverage: f64,
    pub confidence: f64,
}

/// Count of direct+transitive dependents that become unblocked once `id`
/// completes (i.e. `id` is their only remaining unsatisfied dependency).
fn descendants_unblocked_on_completion(tasks: &HashMap<TaskId, Task>, id: TaskId) -> usize {
    let mut count = 0;
    for task in tasks.values() {
        if task.status.is_terminal() || !task.depends.contains(&id) {
            continue;
        }
        let other_unsatisfied = task
            .depends
            .iter()
            .filter(|d| **d != id)
            .any(|d| !dep_satisfied(tasks, *d));
        if !other_unsatisfied {
            count += 1;
        }
    }
    count
}

/// Leverage analysis. Ordering: leverage desc, then
/// priority, then id.
pub fn analyze(
    tasks: &HashMap<TaskId, Task>,
    strategy: SizeStrategy,
    current_phase: Option<&str>,
) -> Vec<LeverageRecommendation> {
    let mut recs: Vec<LeverageRecommendation> = tasks
        .values()
        .filter(|t| !t.status.is_terminal() && !t.is_epic())
        .map(|t| {
            let descendants = descendants_unblocked_on_completion(tasks, t.id) as f64;
            let weight = size_weight(strategy, t.size);
            let boost = phase_boost(t.priority, t.phase.as_deref(), current_phase);
            let leverage = descendants * weight * boost;
            let confidence = if descendants > 0.0 { 0.9 } else { 0.5 };
            LeverageRecommendation {
                task_id: t.id,
                leverage,
                confidence,
            }
        })
        .collect();

    recs.sort_by(|a, b| {
        b.leverage
            .partial_cmp(&a.leverage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| priority_rank(tasks[&a.task_id].priority).cmp(&priority_rank(tasks[&b.task_id].priority)))
            .then_with(|| a.task_id.cmp(&b.task_id))
    });

    recs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Stale,
    Critical,
    Abandoned,
}

#[derive(Debug, Clone, Copy)]
pub struct StalenessThresholds {
    pub stale_days: i64,
    pub critical_days: i64,
    pub abandoned_days: i64,
}

impl Default for StalenessThresholds {
    fn default() -> Self {
        Self {
            stale_days: 7,
            critical_days: 14,
            abandoned_days: 30,
        }
    }
}

pub fn staleness(
    task: &Task,
    now: chrono::DateTime<chrono::Utc>,
    thresholds: StalenessThresholds,
) -> Staleness {
    if task.status.is_terminal() {
        return Staleness::Fresh;
    }
    let last_activity = [Some(task.updated_at), task.completed_at, Some(task.created_at)]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(task.created_at);
    let days = (now - last_activity).num_days();
    if days >= thresholds.abandoned_days {
        Staleness::Abandoned
    } else if days >= thresholds.critical_days {
        Staleness::Critical
    } else if days >= thresholds.stale_days {
        Staleness::Stale
    } else {
        Staleness::Fresh
    }
}

// ---- hierarchy helpers used by the validator -------------------------

pub fn depth_of(tasks: &HashMap<TaskId, Task>, id: TaskId) -> usize {
    let mut depth = 0;
    let mut current = id;
    let mut seen = HashSet::new();
    while let Some(parent) = tasks.get(&current).and_then(|t| t.parent_id) {
        if !seen.insert(current) {
            break; // cycle; let the validator's cycle check report it
        }
        depth += 1;
        current = parent;
        if depth > tasks.len() {
            break;
        }
    }
    depth
}

pub fn parent_chain_has_cycle(tasks: &HashMap<TaskId, Task>) -> bool {
    for start in tasks.keys() {
        let mut seen = HashSet::new();
        let mut current = *start;
        loop {
            if !seen.insert(current) {
                return true;
            }
            match tasks.get(&current).and_then(|t| t.parent_id) {
                Some(p) if tasks.contains_key(&p) => current = p,
                _ => break,
            }
        }
    }
    false
}

pub fn dependency_graph_has_cycle(tasks: &HashMap<TaskId, Task>) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Temp,
        Perm,
    }
    fn visit(
        id: TaskId,
        tasks: &HashMap<TaskId, Task>,
        marks: &mut HashMap<TaskId, Mark>,
    ) -> bool {
        match marks.get(&id) {
            Some(Mark::Perm) => return false,
            Some(Mark::Temp) => return true,
            None => {}
        }
        marks.insert(id, Mark::Temp);
        if let Some(task) = tasks.get(&id) {
            for dep in &task.depends {
                if tasks.contains_key(dep) && visit(*dep, tasks, marks) {
                    return true;
                }
            }
        }
        marks.insert(id, Mark::Perm);
        false
    }

    let mut marks = HashMap::new();
    for id in tasks.keys() {
        if visit(*id, tasks, &mut marks) {
            return true;
        }
    }
    false
}

/// All descendants of `root` (children, grandchildren, ...) by `parentId`.
pub fn descendants_of(tasks: &HashMap<TaskId, Task>, root: TaskId) -> Vec<TaskId> {
    let mut children_of: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for t in tasks.values() {
        if let Some(p) = t.parent_id {
            children_of.entry(p).or_default().push(t.id);
        }
    }
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if let Some(children) = children_of.get(&id) {
            for c in children {
                out.push(*c);
                stack.push(*c);
            }
        }
    }
    out
}

/// Tasks restricted to the subtree rooted at `root` (inclusive).
pub fn subtree(tasks: &HashMap<TaskId, Task>, root: TaskId) -> HashMap<TaskId, Task> {
    let mut ids: HashSet<TaskId> = descendants_of(tasks, root).into_iter().collect();
    ids.insert(root);
    tasks
        .iter()
        .filter(|(id, _)| ids.contains(id))
        .map(|(id, t)| (*id, t.clone()))
        .collect()
}

pub fn task_type_epic_only(task_type: TaskType) -> bool {
    matches!(task_type, TaskType::Epic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, TaskType};
    use chrono::Utc;

    fn mk(id: u64, deps: &[u64]) -> Task {
        let mut t = Task::new(TaskId::new(id), format!("t{id}"), TaskType::Task, Utc::now());
        for d in deps {
            t.depends.insert(TaskId::new(*d));
        }
        t
    }

    fn to_map(tasks: Vec<Task>) -> HashMap<TaskId, Task> {
        tasks.into_iter().map(|t| (t.id, t)).collect()
    }

    #[test]
    fn waves_epic_decomposition_scenario() {
        // T002, T003 independent; T004 depends on both.
        let tasks = to_map(vec![mk(2, &[]), mk(3, &[]), mk(4, &[2, 3])]);
        let waves = compute_waves(&tasks);
        assert_eq!(
            waves,
            vec![
                vec![TaskId::new(2), TaskId::new(3)],
                vec![TaskId::new(4)],
            ]
        );
    }

    #[test]
    fn waves_partial_completion() {
        let mut tasks = to_map(vec![mk(1, &[]), mk(2, &[1]), mk(3, &[1]), mk(4, &[2, 3])]);
        tasks.get_mut(&TaskId::new(1)).unwrap().status = TaskStatus::Done;
        let waves = compute_waves(&tasks);
        assert_eq!(
            waves,
            vec![
                vec![TaskId::new(2), TaskId::new(3)],
                vec![TaskId::new(4)],
            ]
        );

        tasks.get_mut(&TaskId::new(2)).unwrap().status = TaskStatus::Done;
        let waves = compute_waves(&tasks);
        assert_eq!(waves, vec![vec![TaskId::new(3)], vec![TaskId::new(4)]]);
    }

    #[test]
    fn next_task_tie_break_by_id() {
        let tasks = to_map(vec![mk(2, &[]), mk(3, &[])]);
        assert_eq!(next_task(&tasks), Some(TaskId::new(2)));
    }

    #[test]
    fn next_task_prefers_already_active() {
        let mut tasks = to_map(vec![mk(2, &[]), mk(3, &[])]);
        tasks.get_mut(&TaskId::new(3)).unwrap().status = TaskStatus::Active;
        assert_eq!(next_task(&tasks), Some(TaskId::new(3)));
    }

    #[test]
    fn empty_graph_returns_empty() {
        let tasks: HashMap<TaskId, Task> = HashMap::new();
        assert!(compute_waves(&tasks).is_empty());
        assert!(next_task(&tasks).is_none());
        assert!(critical_path(&tasks).is_empty());
    }

    #[test]
    fn single_task_self_dependency_is_a_cycle() {
        let mut t = mk(1, &[]);
        t.depends.insert(TaskId::new(1));
        let tasks = to_map(vec![t]);
        assert!(dependency_graph_has_cycle(&tasks));
    }
}
