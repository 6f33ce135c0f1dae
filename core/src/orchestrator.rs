// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator engine.
//!
//! Wave computation over an epic's subtree, ready/next selection, and
//! spawn-prompt assembly. Prompt assembly concatenates a base subagent
//! protocol with one conditional protocol chosen from a fixed dispatch
//! table by task type/keywords, rendering `CLAUDE.md` from a `handlebars`
//! template — the template lives in-crate since prompt assembly is core's
//! job, not a front-end's.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde_json::json;
use std::collections::BTreeMap;

use crate::{
    audit::AuditEntry,
    error::{CleoError, Result},
    graph,
    models::{Task, TaskId, TaskStatus},
};

pub fn ready(tasks: &BTreeMap<TaskId, Task>, epic_id: TaskId) -> Vec<TaskId> {
    let all: std::collections::HashMap<TaskId, Task> = tasks.iter().map(|(k, v)| (*k, v.clone())).collect();
    let subtree: std::collections::HashMap<TaskId, Task> = graph::subtree(&all, epic_id)
        .into_iter()
        .filter(|(id, _)| *id != epic_id)
        .collect();
    graph::compute_waves(&subtree).into_iter().next().unwrap_or_default()
}

pub fn next(tasks: &BTreeMap<TaskId, Task>, epic_id: TaskId, strategy: graph::SizeStrategy, current_phase: Option<&str>) -> Option<TaskId> {
    let wave0: std::collections::HashSet<TaskId> = ready(tasks, epic_id).into_iter().collect();
    let subtree: std::collections::HashMap<TaskId, Task> = tasks.iter().map(|(k, v)| (*k, v.clone())).collect();
    graph::analyze(&subtree, strategy, current_phase)
        .into_iter()
        .find(|r| wave0.contains(&r.task_id))
        .map(|r| r.task_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Research,
    Decomposition,
    Implementation,
    Specification,
    Contribution,
    Consensus,
    Release,
}

/// Fixed dispatch table from task title/labels to a conditional protocol.
/// Falls back to `Implementation`.
pub fn classify(task: &Task) -> ProtocolKind {
    let haystack = format!("{} {}", task.title.to_lowercase(), task.labels.iter().cloned().collect::<Vec<_>>().join(" ").to_lowercase());
    let has = |kw: &str| haystack.contains(kw);

    if task.is_epic() {
        ProtocolKind::Decomposition
    } else if has("research") || has("investigate") || has("spike") {
        ProtocolKind::Research
    } else if has("spec") || has("design-doc") || has("rfc") {
        ProtocolKind::Specification
    } else if has("consensus") || has("vote") || has("review-panel") {
        ProtocolKind::Consensus
    } else if has("release") || has("publish") || has("ship") {
        ProtocolKind::Release
    } else if has("contribute") || has("external") || has("upstream") {
        ProtocolKind::Contribution
    } else {
        ProtocolKind::Implementation
    }
}

const BASE_PROTOCOL: &str = "You are a subagent working on task {{taskId}} within epic {{epicId}} as of {{date}}. \
Read the task's title, description, and verification gates before acting. \
Append a manifest entry linking back to {{taskId}} when you finish.";

fn conditional_protocol(kind: ProtocolKind) -> &'static str {
    match kind {
        ProtocolKind::Research => "RESEARCH PROTOCOL: investigate the question in the task title, cite sources, do not modify code.",
        ProtocolKind::Decomposition => "DECOMPOSITION PROTOCOL: break {{taskId}} into child tasks with explicit depends edges; do not implement.",
        ProtocolKind::Implementation => "IMPLEMENTATION PROTOCOL: implement {{taskId}}, update files, and drive its verification gates in order.",
        ProtocolKind::Specification => "SPECIFICATION PROTOCOL: produce a design document for {{taskId}}; do not implement until it is reviewed.",
        ProtocolKind::Contribution => "CONTRIBUTION PROTOCOL: prepare a patch suitable for an external upstream; follow that project's contribution guidelines.",
        ProtocolKind::Consensus => "CONSENSUS PROTOCOL: gather independent assessments for {{taskId}} and synthesize a recommendation.",
        ProtocolKind::Release => "RELEASE PROTOCOL: verify {{taskId}}'s prerequisites are all done before tagging or publishing.",
    }
}

#[derive(Debug, Clone)]
pub struct SpawnPrompt {
    pub text: String,
    pub fully_resolved: bool,
}

pub fn spawn(tasks: &BTreeMap<TaskId, Task>, epic_id: TaskId, task_id: TaskId, now: DateTime<Utc>) -> Result<SpawnPrompt> {
    let task = tasks.get(&task_id).ok_or_else(|| CleoError::not_found(task_id))?;
    let kind = classify(task);

    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_template_string("base", BASE_PROTOCOL).map_err(|e| CleoError::Internal(e.to_string()))?;
    hb.register_template_string("conditional", conditional_protocol(kind)).map_err(|e| CleoError::Internal(e.to_string()))?;

    let vars = json!({
        "taskId": task_id.to_string(),
        "epicId": epic_id.to_string(),
        "date": now.format("%Y-%m-%d").to_string(),
    });

    let base_rendered = hb.render("base", &vars);
    let conditional_rendered = hb.render("conditional", &vars);

    match (base_rendered, conditional_rendered) {
        (Ok(base), Ok(conditional)) => Ok(SpawnPrompt {
            text: format!("{base}\n\n{conditional}"),
            fully_resolved: true,
        }),
        _ => Ok(SpawnPrompt {
            text: String::new(),
            fully_resolved: false,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct SubagentOutput {
    pub task_id: TaskId,
    pub manifest_fields: BTreeMap<String, serde_json::Value>,
    pub linked_tasks: Vec<TaskId>,
}

pub struct RecordReturnOutcome {
    pub audit_entry: AuditEntry,
    pub task_status: TaskStatus,
}

/// Records a subagent's return: caller is responsible for appending the
/// manifest entry and running compliance scoring separately; this just
/// advances the task's lifecycle stage to `blocked` (awaiting
/// verification) once output lands.
pub fn record_return(tasks: &mut BTreeMap<TaskId, Task>, output: &SubagentOutput, now: DateTime<Utc>) -> Result<RecordReturnOutcome> {
    let task = tasks.get_mut(&output.task_id).ok_or_else(|| CleoError::not_found(output.task_id))?;
    if !output.linked_tasks.contains(&output.task_id) {
        return Err(CleoError::validation("manifest does not link back to the spawning task"));
    }
    if task.status == TaskStatus::Pending || task.status == TaskStatus::Active {
        task.status = TaskStatus::Blocked;
        task.updated_at = now;
    }
    let status = task.status;

    Ok(RecordReturnOutcome {
        audit_entry: AuditEntry::new("orchestrator.record_return", "orchestrator", now).with_task(output.task_id),
        task_status: status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTask, TaskType};

    fn epic_with_children() -> BTreeMap<TaskId, Task> {
        let mut active = BTreeMap::new();
        let archived = BTreeMap::new();
        let v = crate::validation::Validator::default();
        let config = crate::config::Config::default();
        let now = Utc::now();

        let epic = crate::lifecycle::add(&mut active, &archived, NewTask { title: "Epic".into(), task_type: TaskType::Epic, ..Default::default() }, &v, &config, now).unwrap();
        let a = crate::lifecycle::add(&mut active, &archived, NewTask { title: "A".into(), parent_id: Some(epic.id), ..Default::default() }, &v, &config, now).unwrap();
        let b = crate::lifecycle::add(&mut active, &archived, NewTask { title: "B".into(), parent_id: Some(epic.id), ..Default::default() }, &v, &config, now).unwrap();
        let mut c_new = NewTask { title: "C".into(), parent_id: Some(epic.id), ..Default::default() };
        c_new.depends.insert(a.id);
        c_new.depends.insert(b.id);
        crate::lifecycle::add(&mut active, &archived, c_new, &v, &config, now).unwrap();
        active
    }

    #[test]
    fn ready_returns_wave_zero() {
        let active = epic_with_children();
        let wave0 = ready(&active, TaskId::new(1));
        assert_eq!(wave0, vec![TaskId::new(2), TaskId::new(3)]);
    }

    #[test]
    fn next_picks_lowest_id_in_wave_zero() {
        let active = epic_with_children();
        let picked = next(&active, TaskId::new(1), graph::SizeStrategy::Balanced, None);
        assert_eq!(picked, Some(TaskId::new(2)));
    }

    #[test]
    fn spawn_prompt_is_fully_resolved() {
        let active = epic_with_children();
        let prompt = spawn(&active, TaskId::new(1), TaskId::new(2), Utc::now()).unwrap();
        assert!(prompt.fully_resolved);
        assert!(prompt.text.contains("T2"));
        assert!(prompt.text.contains("IMPLEMENTATION PROTOCOL"));
    }

    #[test]
    fn record_return_rejects_unlinked_manifest() {
        let mut active = epic_with_children();
        let output = SubagentOutput {
            task_id: TaskId::new(2),
            manifest_fields: BTreeMap::new(),
            linked_tasks: vec![TaskId::new(3)],
        };
        let err = record_return(&mut active, &output, Utc::now()).unwrap_err();
        assert!(err.is_validation());
    }
}
