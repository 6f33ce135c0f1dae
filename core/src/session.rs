// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session & focus manager.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::{
    error::{CleoError, Result},
    models::{Focus, FocusHistoryEntry, Scope, Session, SessionId, SessionStatus, TaskId, TaskStatus},
};

/// HARD conflict against any other `active` session.
fn hard_conflict<'a>(
    sessions: &'a BTreeMap<String, Session>,
    scope: &Scope,
) -> Option<&'a Session> {
    sessions
        .values()
        .find(|s| s.status == SessionStatus::Active && s.scope.hard_conflicts_with(scope))
}

fn soft_overlap<'a>(
    sessions: &'a BTreeMap<String, Session>,
    scope: &Scope,
) -> Option<&'a Session> {
    sessions
        .values()
        .find(|s| s.status == SessionStatus::Active && s.scope.soft_overlaps_with(scope))
}

pub struct StartOutcome {
    pub session: Session,
    pub warning: Option<String>,
}

pub fn start(
    sessions: &mut BTreeMap<String, Session>,
    name: String,
    scope: Scope,
    agent: Option<String>,
    allow_soft_overlap: bool,
    id_suffix_hex: &str,
    now: DateTime<Utc>,
) -> Result<StartOutcome> {
    if let Some(conflicting) = hard_conflict(sessions, &scope) {
        return Err(CleoError::StateConflict(format!(
            "session {} already holds a conflicting scope",
            conflicting.id
        )));
    }

    let mut warning = None;
    if let Some(overlapping) = soft_overlap(sessions, &scope) {
        if !allow_soft_overlap {
            return Err(CleoError::StateConflict(format!(
                "session {} holds an overlapping scope and soft overlap is disabled",
                overlapping.id
            )));
        }
        warning = Some(format!(
            "scope softly overlaps with active session {}",
            overlapping.id
        ));
    }

    let id = SessionId::new(now, id_suffix_hex);
    let session = Session {
        id: id.clone(),
        name,
        status: SessionStatus::Active,
        scope,
        focus: Focus::default(),
        agent,
        started_at: now,
        ended_at: None,
        notes: Vec::new(),
        tasks_completed: Vec::new(),
        tasks_created: Vec::new(),
    };
    sessions.insert(id.to_string(), session.clone());

    Ok(StartOutcome { session, warning })
}

fn require_session<'a>(sessions: &'a mut BTreeMap<String, Session>, id: &SessionId) -> Result<&'a mut Session> {
    sessions
        .get_mut(id.as_str())
        .ok_or_else(|| CleoError::not_found(id))
}

pub fn suspend(sessions: &mut BTreeMap<String, Session>, id: &SessionId) -> Result<Session> {
    let session = require_session(sessions, id)?;
    if session.status != SessionStatus::Active {
        return Err(CleoError::invalid_transition(session.status_name(), "suspended"));
    }
    session.status = SessionStatus::Suspended;
    Ok(session.clone())
}

pub fn resume(sessions: &mut BTreeMap<String, Session>, id: &SessionId) -> Result<Session> {
    let session = require_session(sessions, id)?;
    if session.status != SessionStatus::Suspended {
        return Err(CleoError::invalid_transition(session.status_name(), "active"));
    }
    session.status = SessionStatus::Active;
    Ok(session.clone())
}

pub fn end(
    sessions: &mut BTreeMap<String, Session>,
    focus_history: &mut BTreeMap<String, Vec<FocusHistoryEntry>>,
    id: &SessionId,
    now: DateTime<Utc>,
) -> Result<Session> {
    clear_focus(sessions, focus_history, id, now).ok();
    let session = require_session(sessions, id)?;
    session.status = SessionStatus::Ended;
    session.ended_at = Some(now);
    Ok(session.clone())
}

/// Any `ended` session older than `max_age_days` becomes `orphaned`.
pub fn garbage_collect(sessions: &mut BTreeMap<String, Session>, max_age_days: i64, now: DateTime<Utc>) -> Vec<SessionId> {
    let mut orphaned = Vec::new();
    for session in sessions.values_mut() {
        if session.status == SessionStatus::Ended {
            if let Some(ended_at) = session.ended_at {
                if (now - ended_at).num_days() >= max_age_days {
                    session.status = SessionStatus::Orphaned;
                    orphaned.push(session.id.clone());
                }
            }
        }
    }
    orphaned
}

pub fn set_focus(
    sessions: &mut BTreeMap<String, Session>,
    focus_history: &mut BTreeMap<String, Vec<FocusHistoryEntry>>,
    tasks: &mut BTreeMap<TaskId, crate::models::Task>,
    id: &SessionId,
    task_id: TaskId,
    now: DateTime<Utc>,
) -> Result<Session> {
    if !tasks.contains_key(&task_id) {
        return Err(CleoError::not_found(task_id));
    }

    clear_focus(sessions, focus_history, id, now).ok();

    let session = require_session(sessions, id)?;
    session.focus = Focus {
        task_id: Some(task_id),
        set_at: Some(now),
    };
    let session_out = session.clone();

    focus_history.entry(id.to_string()).or_default().push(FocusHistoryEntry {
        task_id,
        set_at: now,
        cleared_at: None,
    });

    if let Some(task) = tasks.get_mut(&task_id) {
        if task.status == TaskStatus::Pending {
            task.status = TaskStatus::Active;
            task.updated_at = now;
        }
    }

    Ok(session_out)
}

pub fn clear_focus(
    sessions: &mut BTreeMap<String, Session>,
    focus_history: &mut BTreeMap<String, Vec<FocusHistoryEntry>>,
    id: &SessionId,
    now: DateTime<Utc>,
) -> Result<Session> {
    let session = require_session(sessions, id)?;
    session.focus = Focus::default();
    let session_out = session.clone();

    if let Some(rows) = focus_history.get_mut(id.as_str()) {
        if let Some(open) = rows.iter_mut().find(|r| r.cleared_at.is_none()) {
            open.cleared_at = Some(now);
        }
    }

    Ok(session_out)
}

impl Session {
    fn status_name(&self) -> &'static str {
        match self.status {
            SessionStatus::Active => "active",
            SessionStatus::Suspended => "suspended",
            SessionStatus::Ended => "ended",
            SessionStatus::Orphaned => "orphaned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskType;

    #[test]
    fn session_conflict_scenario() {
        let mut sessions = BTreeMap::new();
        let now = Utc::now();
        let scope = Scope::Epic { epic_id: TaskId::new(1) };

        let s1 = start(&mut sessions, "s1".into(), scope.clone(), None, true, "abcdef", now).unwrap();
        assert!(s1.warning.is_none());

        let err = start(&mut sessions, "s2".into(), scope, None, true, "123456", now).unwrap_err();
        assert!(matches!(err, CleoError::StateConflict(_)));

        let global_result = start(&mut sessions, "s3".into(), Scope::Global, None, true, "abcabc", now).unwrap();
        assert!(global_result.warning.is_some());
    }

    #[test]
    fn focus_set_activates_pending_task_and_history_has_one_open_row() {
        let mut sessions = BTreeMap::new();
        let mut focus_history = BTreeMap::new();
        let mut tasks = BTreeMap::new();
        let now = Utc::now();

        let task = crate::models::Task::new(TaskId::new(1), "t".into(), TaskType::Task, now);
        tasks.insert(task.id, task);

        let outcome = start(&mut sessions, "s".into(), Scope::Global, None, true, "abcdef", now).unwrap();
        set_focus(&mut sessions, &mut focus_history, &mut tasks, &outcome.session.id, TaskId::new(1), now).unwrap();

        assert_eq!(tasks[&TaskId::new(1)].status, TaskStatus::Active);
        let rows = &focus_history[outcome.session.id.as_str()];
        assert_eq!(rows.iter().filter(|r| r.cleared_at.is_none()).count(), 1);

        clear_focus(&mut sessions, &mut focus_history, &outcome.session.id, now).unwrap();
        let rows = &focus_history[outcome.session.id.as_str()];
        assert_eq!(rows.iter().filter(|r| r.cleared_at.is_none()).count(), 0);
    }

    #[test]
    fn gc_orphans_old_ended_sessions() {
        let mut sessions = BTreeMap::new();
        let now = Utc::now();
        let mut focus_history = BTreeMap::new();
        let outcome = start(&mut sessions, "s".into(), Scope::Global, None, true, "abcdef", now).unwrap();
        end(&mut sessions, &mut focus_history, &outcome.session.id, now - chrono::Duration::days(40)).unwrap();

        let orphaned = garbage_collect(&mut sessions, 30, now);
        assert_eq!(orphaned, vec![outcome.session.id]);
    }
}
