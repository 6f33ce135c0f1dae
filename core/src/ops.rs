// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public operation surface.
//!
//! A closed set of named operations, each `Op(request, accessor, clock,
//! config) -> {response | error}`. The CLI dispatcher and the MCP JSON-RPC
//! server are thin adapters over [`execute`]; neither can bypass
//! validation or audit logging because both go through this one function.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::{
    accessor::DataAccessor,
    audit::AuditEntry,
    config::Config,
    error::{CleoError, Result},
    graph,
    lifecycle,
    models::{ChildStrategy, NewTask, Scope, SessionId, TaskFilter, TaskId, UpdateTask, VerificationGate},
    orchestrator, session,
    validation::Validator,
};

/// Everything an operation needs besides the request itself. `now` is the
/// frozen clock: every operation is deterministic under a fixed `now`.
pub struct OpContext<'a> {
    pub accessor: &'a dyn DataAccessor,
    pub config: &'a Config,
    pub now: DateTime<Utc>,
    pub actor: String,
}

/// A closed, named request. The CLI/MCP front-ends parse their own input
/// into one of these; nothing downstream accepts an unparsed string.
pub enum Operation {
    Add(NewTask),
    Update { id: TaskId, changes: UpdateTask },
    Show(TaskId),
    List(TaskFilter),
    Find(String),
    Complete(TaskId),
    Reopen(TaskId),
    Cancel { id: TaskId, reason: String, strategy: ChildStrategy, force: bool },
    Uncancel(TaskId),
    Delete { id: TaskId, strategy: ChildStrategy, force: bool },
    Archive(TaskId),
    Unarchive(TaskId),
    SetGate { id: TaskId, gate: VerificationGate, value: Option<bool>, agent: String, creator: String },
    FocusSet { session_id: SessionId, task_id: TaskId },
    FocusShow(SessionId),
    FocusClear(SessionId),
    SessionStart { name: String, scope: Scope, agent: Option<String>, id_suffix_hex: String },
    SessionEnd(SessionId),
    SessionSuspend(SessionId),
    SessionResume(SessionId),
    SessionStatus(SessionId),
    Analyze { strategy: graph::SizeStrategy, current_phase: Option<String> },
    Deps(TaskId),
    Waves,
    Next,
    Validate,
    Doctor,
    Migrate,
    OrchestratorReady(TaskId),
    OrchestratorNext(TaskId),
    OrchestratorSpawn { epic_id: TaskId, task_id: TaskId },
    MetricsSummary,
}

pub async fn execute(op: Operation, ctx: &OpContext<'_>) -> Result<Value> {
    let validator = Validator {
        max_title_len: ctx.config.max_title_len,
        max_description_len: ctx.config.max_description_len,
        max_depth: ctx.config.max_hierarchy_depth,
    };

    match op {
        Operation::Add(new_task) => {
            let mut doc = ctx.accessor.load_todo().await?;
            let archive = ctx.accessor.load_archive().await?;
            let created = lifecycle::add(&mut doc.tasks, &archive.tasks, new_task, &validator, ctx.config, ctx.now)?;
            ctx.accessor.save_todo(&doc).await?;
            audit(ctx, "task.add", Some(created.id), None, Some(&created)).await?;
            Ok(json!(created))
        }

        Operation::Update { id, changes } => {
            let mut doc = ctx.accessor.load_todo().await?;
            let before = doc.tasks.get(&id).cloned();
            let updated = lifecycle::update(&mut doc.tasks, id, changes, &validator, ctx.now)?;
            ctx.accessor.save_todo(&doc).await?;
            audit_before_after(ctx, "task.update", Some(id), before.as_ref(), Some(&updated)).await?;
            Ok(json!(updated))
        }

        Operation::Show(id) => {
            let doc = ctx.accessor.load_todo().await?;
            let task = doc.tasks.get(&id).cloned().ok_or_else(|| CleoError::not_found(id))?;
            Ok(json!(task))
        }

        Operation::List(filter) => {
            let doc = ctx.accessor.load_todo().await?;
            let mut tasks: Vec<_> = doc.tasks.values().filter(|t| matches_filter(t, &filter)).cloned().collect();
            tasks.sort_by_key(|t| t.id);
            if let Some(offset) = filter.offset {
                tasks = tasks.into_iter().skip(offset as usize).collect();
            }
            if let Some(limit) = filter.limit {
                tasks.truncate(limit as usize);
            }
            Ok(json!(tasks))
        }

        Operation::Find(query) => {
            let doc = ctx.accessor.load_todo().await?;
            let needle = query.to_lowercase();
            let mut tasks: Vec<_> = doc
                .tasks
                .values()
                .filter(|t| {
                    t.title.to_lowercase().contains(&needle)
                        || t.description.as_deref().unwrap_or_default().to_lowercase().contains(&needle)
                })
                .cloned()
                .collect();
            tasks.sort_by_key(|t| t.id);
            Ok(json!(tasks))
        }

        Operation::Complete(id) => {
            let mut doc = ctx.accessor.load_todo().await?;
            let before = doc.tasks.get(&id).cloned();
            let outcome = lifecycle::complete(&mut doc.tasks, id, &validator, ctx.now)?;
            ctx.accessor.save_todo(&doc).await?;
            audit_before_after(ctx, "task.complete", Some(id), before.as_ref(), Some(&outcome.task)).await?;
            Ok(json!({ "task": outcome.task, "autoCompletedAncestors": outcome.auto_completed_ancestors }))
        }

        Operation::Reopen(id) => {
            let mut doc = ctx.accessor.load_todo().await?;
            let before = doc.tasks.get(&id).cloned();
            let outcome = lifecycle::reopen(&mut doc.tasks, id, &validator, ctx.now)?;
            ctx.accessor.save_todo(&doc).await?;
            audit_before_after(ctx, "task.reopen", Some(id), before.as_ref(), Some(&outcome.task)).await?;
            Ok(json!({ "task": outcome.task, "autoReopenedAncestors": outcome.auto_reopened_ancestors }))
        }

        Operation::Cancel { id, reason, strategy, force } => {
            let mut doc = ctx.accessor.load_todo().await?;
            let before = doc.tasks.get(&id).cloned();
            let outcome = lifecycle::cancel(&mut doc.tasks, id, &reason, strategy, force, &validator, ctx.config, ctx.now)?;
            ctx.accessor.save_todo(&doc).await?;
            audit_before_after(ctx, "task.cancel", Some(id), before.as_ref(), doc.tasks.get(&id)).await?;
            Ok(json!({ "affected": outcome.affected }))
        }

        Operation::Uncancel(id) => {
            let mut doc = ctx.accessor.load_todo().await?;
            let before = doc.tasks.get(&id).cloned();
            let task = lifecycle::uncancel(&mut doc.tasks, id, ctx.now)?;
            ctx.accessor.save_todo(&doc).await?;
            audit_before_after(ctx, "task.uncancel", Some(id), before.as_ref(), Some(&task)).await?;
            Ok(json!(task))
        }

        Operation::Delete { id, strategy, force } => {
            let mut doc = ctx.accessor.load_todo().await?;
            let before = doc.tasks.get(&id).cloned();
            let removed = lifecycle::delete(&mut doc.tasks, id, strategy, force, ctx.config)?;
            ctx.accessor.save_todo(&doc).await?;
            audit_before_after(ctx, "task.delete", Some(id), before.as_ref(), None).await?;
            Ok(json!({ "removed": removed }))
        }

        Operation::Archive(id) => {
            let mut doc = ctx.accessor.load_todo().await?;
            let mut archive = ctx.accessor.load_archive().await?;
            let task = doc.tasks.remove(&id).ok_or_else(|| CleoError::not_found(id))?;
            if !task.status.is_terminal() {
                doc.tasks.insert(id, task);
                return Err(CleoError::StateConflict(format!("{id} must be done or cancelled before archiving")));
            }
            archive.tasks.insert(id, task.clone());
            ctx.accessor.save_todo(&doc).await?;
            ctx.accessor.save_archive(&archive).await?;
            audit(ctx, "task.archive", Some(id), Some(&task), Some(&task)).await?;
            Ok(json!(task))
        }

        Operation::Unarchive(id) => {
            let mut doc = ctx.accessor.load_todo().await?;
            let mut archive = ctx.accessor.load_archive().await?;
            let mut task = archive.tasks.remove(&id).ok_or_else(|| CleoError::not_found(id))?;
            task.updated_at = ctx.now;
            doc.tasks.insert(id, task.clone());
            ctx.accessor.save_todo(&doc).await?;
            ctx.accessor.save_archive(&archive).await?;
            audit(ctx, "task.unarchive", Some(id), None, Some(&task)).await?;
            Ok(json!(task))
        }

        Operation::SetGate { id, gate, value, agent, creator } => {
            let mut doc = ctx.accessor.load_todo().await?;
            let task = doc.tasks.get_mut(&id).ok_or_else(|| CleoError::not_found(id))?;
            let before = task.clone();
            lifecycle::set_gate(task, gate, value, &agent, &creator, &validator, ctx.config, ctx.now)?;
            let after = task.clone();
            ctx.accessor.save_todo(&doc).await?;
            audit_before_after(ctx, "task.verification.set_gate", Some(id), Some(&before), Some(&after)).await?;
            Ok(json!(after))
        }

        Operation::FocusSet { session_id, task_id } => {
            let mut doc = ctx.accessor.load_todo().await?;
            let mut sessions = ctx.accessor.load_sessions().await?;
            let result = session::set_focus(&mut sessions.sessions, &mut sessions.focus_history, &mut doc.tasks, &session_id, task_id, ctx.now)?;
            ctx.accessor.save_sessions(&sessions).await?;
            ctx.accessor.save_todo(&doc).await?;
            audit(ctx, "focus.set", Some(task_id), None, None).await?;
            Ok(json!(result))
        }

        Operation::FocusShow(session_id) => {
            let sessions = ctx.accessor.load_sessions().await?;
            let s = sessions.sessions.get(session_id.as_str()).ok_or_else(|| CleoError::not_found(&session_id))?;
            Ok(json!(s.focus))
        }

        Operation::FocusClear(session_id) => {
            let mut sessions = ctx.accessor.load_sessions().await?;
            session::clear_focus(&mut sessions.sessions, &mut sessions.focus_history, &session_id, ctx.now)?;
            ctx.accessor.save_sessions(&sessions).await?;
            audit(ctx, "focus.clear", None, None, None).await?;
            Ok(json!({ "sessionId": session_id }))
        }

        Operation::SessionStart { name, scope, agent, id_suffix_hex } => {
            let mut sessions = ctx.accessor.load_sessions().await?;
            let outcome = session::start(&mut sessions.sessions, name, scope, agent, ctx.config.allow_soft_scope_overlap, &id_suffix_hex, ctx.now)?;
            ctx.accessor.save_sessions(&sessions).await?;
            audit(ctx, "session.start", None, None, None).await?;
            Ok(json!({ "session": outcome.session, "warning": outcome.warning }))
        }

        Operation::SessionEnd(id) => {
            let mut sessions = ctx.accessor.load_sessions().await?;
            let s = session::end(&mut sessions.sessions, &mut sessions.focus_history, &id, ctx.now)?;
            ctx.accessor.save_sessions(&sessions).await?;
            audit(ctx, "session.end", None, None, None).await?;
            Ok(json!(s))
        }

        Operation::SessionSuspend(id) => {
            let mut sessions = ctx.accessor.load_sessions().await?;
            let s = session::suspend(&mut sessions.sessions, &id)?;
            ctx.accessor.save_sessions(&sessions).await?;
            Ok(json!(s))
        }

        Operation::SessionResume(id) => {
            let mut sessions = ctx.accessor.load_sessions().await?;
            let s = session::resume(&mut sessions.sessions, &id)?;
            ctx.accessor.save_sessions(&sessions).await?;
            Ok(json!(s))
        }

        Operation::SessionStatus(id) => {
            let sessions = ctx.accessor.load_sessions().await?;
            let s = sessions.sessions.get(id.as_str()).ok_or_else(|| CleoError::not_found(&id))?;
            Ok(json!(s))
        }

        Operation::Analyze { strategy, current_phase } => {
            let doc = ctx.accessor.load_todo().await?;
            let tasks: std::collections::HashMap<TaskId, _> = doc.tasks.into_iter().collect();
            let recs = graph::analyze(&tasks, strategy, current_phase.as_deref());
            Ok(json!(recs.into_iter().map(|r| json!({ "taskId": r.task_id, "leverage": r.leverage, "confidence": r.confidence })).collect::<Vec<_>>()))
        }

        Operation::Deps(id) => {
            let doc = ctx.accessor.load_todo().await?;
            let task = doc.tasks.get(&id).ok_or_else(|| CleoError::not_found(id))?;
            Ok(json!({ "depends": task.depends, "dependents": doc.tasks.values().filter(|t| t.depends.contains(&id)).map(|t| t.id).collect::<Vec<_>>() }))
        }

        Operation::Waves => {
            let doc = ctx.accessor.load_todo().await?;
            let tasks: std::collections::HashMap<TaskId, _> = doc.tasks.into_iter().collect();
            Ok(json!(graph::compute_waves(&tasks)))
        }

        Operation::Next => {
            let doc = ctx.accessor.load_todo().await?;
            let tasks: std::collections::HashMap<TaskId, _> = doc.tasks.into_iter().collect();
            Ok(json!(graph::next_task(&tasks)))
        }

        Operation::Validate => {
            let doc = ctx.accessor.load_todo().await?;
            let archive = ctx.accessor.load_archive().await?;
            let sessions = ctx.accessor.load_sessions().await?;
            let tasks: std::collections::HashMap<TaskId, _> = doc.tasks.clone().into_iter().collect();

            let mut errors = Vec::new();
            let uniqueness = validator.validate_unique_ids(doc.tasks.keys(), archive.tasks.keys());
            errors.extend(uniqueness.errors);
            let refs = validator.validate_references_and_cycles(&tasks);
            errors.extend(refs.errors);
            for task in doc.tasks.values() {
                errors.extend(validator.validate_gate_chain(task).errors);
            }
            errors.extend(validator.validate_project_phases(&doc.project).errors);
            let session_list: Vec<_> = sessions.sessions.values().cloned().collect();
            errors.extend(validator.validate_session_focus(&session_list).errors);

            Ok(json!({ "valid": errors.is_empty(), "errors": errors.iter().map(|e| json!({ "field": e.field, "code": e.code, "message": e.message })).collect::<Vec<_>>() }))
        }

        Operation::Doctor => {
            let todo_ok = ctx.accessor.load_todo().await.is_ok();
            let archive_ok = ctx.accessor.load_archive().await.is_ok();
            let sessions_ok = ctx.accessor.load_sessions().await.is_ok();
            Ok(json!({ "todoReadable": todo_ok, "archiveReadable": archive_ok, "sessionsReadable": sessions_ok }))
        }

        // Schema migration is idempotent and additive: loading and
        // re-saving through the current document shape is itself the
        // migration once a document's `_meta.schemaVersion` is current.
        Operation::Migrate => {
            let doc = ctx.accessor.load_todo().await?;
            let from_version = doc.meta.schema_version;
            ctx.accessor.save_todo(&doc).await?;
            Ok(json!({ "migrated": true, "fromSchemaVersion": from_version }))
        }

        Operation::OrchestratorReady(epic_id) => {
            let doc = ctx.accessor.load_todo().await?;
            Ok(json!(orchestrator::ready(&doc.tasks, epic_id)))
        }

        Operation::OrchestratorNext(epic_id) => {
            let doc = ctx.accessor.load_todo().await?;
            let next = orchestrator::next(&doc.tasks, epic_id, ctx.config.leverage_strategy, doc.project.current_phase.as_deref());
            Ok(json!(next))
        }

        Operation::OrchestratorSpawn { epic_id, task_id } => {
            let doc = ctx.accessor.load_todo().await?;
            let prompt = orchestrator::spawn(&doc.tasks, epic_id, task_id, ctx.now)?;
            if !prompt.fully_resolved {
                return Err(CleoError::Internal("spawn prompt did not fully resolve its tokens".into()));
            }
            audit(ctx, "orchestrator.spawn", Some(task_id), None, None).await?;
            Ok(json!({ "prompt": prompt.text, "tokenResolution": { "fullyResolved": prompt.fully_resolved } }))
        }

        Operation::MetricsSummary => Ok(json!({ "trackTokens": ctx.config.track_tokens })),
    }
}

fn matches_filter(task: &crate::models::Task, filter: &TaskFilter) -> bool {
    if let Some(status) = filter.status {
        if task.status != status {
            return false;
        }
    }
    if let Some(priority) = filter.priority {
        if task.priority != priority {
            return false;
        }
    }
    if let Some(task_type) = filter.task_type {
        if task.task_type != task_type {
            return false;
        }
    }
    if let Some(phase) = &filter.phase {
        if task.phase.as_deref() != Some(phase.as_str()) {
            return false;
        }
    }
    if let Some(label) = &filter.label {
        if !task.labels.contains(label) {
            return false;
        }
    }
    if let Some(parent_id) = filter.parent_id {
        if task.parent_id != Some(parent_id) {
            return false;
        }
    }
    if let Some(from) = filter.created_from {
        if task.created_at < from {
            return false;
        }
    }
    if let Some(to) = filter.created_to {
        if task.created_at > to {
            return false;
        }
    }
    true
}

async fn audit(ctx: &OpContext<'_>, op: &str, task_id: Option<TaskId>, before: Option<&crate::models::Task>, after: Option<&crate::models::Task>) -> Result<()> {
    audit_before_after(ctx, op, task_id, before, after).await
}

async fn audit_before_after(ctx: &OpContext<'_>, op: &str, task_id: Option<TaskId>, before: Option<&crate::models::Task>, after: Option<&crate::models::Task>) -> Result<()> {
    let mut entry = AuditEntry::new(op, ctx.actor.clone(), ctx.now);
    if let Some(id) = task_id {
        entry = entry.with_task(id);
    }
    entry = entry.with_before_after(before.map(|t| json!(t)), after.map(|t| json!(t)));
    ctx.accessor.append_log(&entry).await
}
