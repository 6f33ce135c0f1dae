// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{
    error::{CleoError, Result},
    graph,
    models::{Session, SessionStatus, Task, TaskId, TaskStatus, VerificationGate},
};
use std::collections::{HashMap, HashSet};

/// One structural or semantic validation failure, with a field path for
/// the CLI/MCP front-ends to surface next to the offending input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, field: &str, code: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            code,
            message: message.into(),
        });
    }
}

pub const DEFAULT_MAX_TITLE_LEN: usize = 200;
pub const DEFAULT_MAX_DESCRIPTION_LEN: usize = 2000;
pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const MIN_REASON_LEN: usize = 3;

/// Multi-layer validator. Each `validate_*` method corresponds to one
/// layer; `validate_write` runs them in order and aborts at the first
/// layer that fails.
pub struct Validator {
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_depth: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            max_description_len: DEFAULT_MAX_DESCRIPTION_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Validator {
    // ---- Layer 2: field semantics ----------------------------------

    pub fn validate_title(&self, title: &str) -> Result<()> {
        if title.is_empty() {
            return Err(CleoError::empty_field("title"));
        }
        if title.contains('\n') || title.contains('\r') {
            return Err(CleoError::validation("title must be a single line"));
        }
        if title.chars().any(is_zero_width) {
            return Err(CleoError::validation("title must not contain zero-width characters"));
        }
        if title.chars().count() > self.max_title_len {
            return Err(CleoError::validation(format!(
                "title must be at most {} characters",
                self.max_title_len
            )));
        }
        Ok(())
    }

    pub fn validate_description(&self, description: &str) -> Result<()> {
        if description.chars().count() > self.max_description_len {
            return Err(CleoError::validation(format!(
                "description must be at most {} characters",
                self.max_description_len
            )));
        }
        Ok(())
    }

    pub fn validate_reason(&self, reason: &str) -> Result<()> {
        let trimmed = reason.trim();
        if trimmed.chars().count() < MIN_REASON_LEN {
            return Err(CleoError::validation(format!(
                "reason must be at least {MIN_REASON_LEN} characters"
            )));
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(CleoError::validation("reason contains control characters"));
        }
        Ok(())
    }

    pub fn validate_file_path(&self, path: &str) -> Result<()> {
        const SHELL_METACHARS: &[char] = &[
            ';', '|', '&', '$', '`', '>', '<', '\n', '\r', '*', '?', '(', ')', '{', '}',
        ];
        if path.chars().any(|c| SHELL_METACHARS.contains(&c)) {
            return Err(CleoError::validation(format!(
                "file path '{path}' contains shell metacharacters"
            )));
        }
        Ok(())
    }

    pub fn validate_timestamp_not_future(
        &self,
        ts: chrono::DateTime<chrono::Utc>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        if ts > now {
            return Err(CleoError::validation("timestamp is in the future"));
        }
        Ok(())
    }

    /// Normalize a label: trim, lowercase is NOT forced (labels keep case),
    /// but whitespace is collapsed and the result must be non-empty.
    pub fn normalize_label(label: &str) -> Result<String> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(CleoError::empty_field("label"));
        }
        Ok(trimmed.to_string())
    }

    // ---- Layer 3: cross-entity --------------------------------------

    /// Id uniqueness across the active document and the archive document.
    pub fn validate_unique_ids<'a>(
        &self,
        active: impl Iterator<Item = &'a TaskId>,
        archived: impl Iterator<Item = &'a TaskId>,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut seen = HashSet::new();
        for id in active.chain(archived) {
            if !seen.insert(*id) {
                report.push("id", "NOT_UNIQUE", format!("duplicate task id {id}"));
            }
        }
        report
    }

    /// References (parent + depends) resolve to existing tasks, and
    /// neither the parent chain nor the dependency graph contains a cycle.
    pub fn validate_references_and_cycles(&self, tasks: &HashMap<TaskId, Task>) -> ValidationReport {
        let mut report = ValidationReport::default();

        for task in tasks.values() {
            if let Some(parent) = task.parent_id {
                if parent == task.id {
                    report.push("parentId", "SELF_REFERENCE", format!("{} cannot be its own parent", task.id));
                } else if !tasks.contains_key(&parent) {
                    report.push("parentId", "DANGLING_REFERENCE", format!("{} has unknown parent {parent}", task.id));
                }
            }
            for dep in &task.depends {
                if *dep == task.id {
                    report.push("depends", "SELF_DEPENDENCY", format!("{} cannot depend on itself", task.id));
                } else if !tasks.contains_key(dep) {
                    report.push("depends", "DANGLING_REFERENCE", format!("{} depends on unknown task {dep}", task.id));
                }
            }
        }

        if graph::parent_chain_has_cycle(tasks) {
            report.push("parentId", "CYCLE", "parent chain contains a cycle");
        }
        if graph::dependency_graph_has_cycle(tasks) {
            report.push("depends", "CYCLE", "dependency graph contains a cycle");
        }

        for task in tasks.values() {
            let depth = graph::depth_of(tasks, task.id);
            if depth > self.max_depth {
                report.push(
                    "parentId",
                    "DEPTH_EXCEEDED",
                    format!("{} is at depth {depth}, max is {}", task.id, self.max_depth),
                );
            }
        }

        report
    }

    /// Verification gate chain consistency: if gate k is true, every
    /// earlier gate in the chain must also be true.
    pub fn validate_gate_chain(&self, task: &Task) -> ValidationReport {
        let mut report = ValidationReport::default();
        for gate in crate::models::GATE_CHAIN {
            if task.verification.gates.get(&gate).copied().flatten() == Some(true) {
                if let Some(pred) = gate.predecessor() {
                    if task.verification.gates.get(&pred).copied().flatten() != Some(true) {
                        report.push(
                            "verification.gates",
                            "GATE_CHAIN_BROKEN",
                            format!("gate {gate:?} is true but predecessor {pred:?} is not"),
                        );
                    }
                }
            }
        }
        report
    }

    /// Exactly one active phase; `currentPhase` consistent with it.
    pub fn validate_project_phases(&self, project: &crate::models::Project) -> ValidationReport {
        let mut report = ValidationReport::default();
        let active: Vec<_> = project
            .phases
            .iter()
            .filter(|(_, p)| p.status == crate::models::PhaseStatus::Active)
            .map(|(name, _)| name.clone())
            .collect();
        if active.len() > 1 {
            report.push("project.phases", "MULTIPLE_ACTIVE_PHASES", format!("{} phases are active", active.len()));
        }
        match (&project.current_phase, active.first()) {
            (Some(current), Some(active_name)) if current != active_name => {
                report.push("project.currentPhase", "INCONSISTENT", "currentPhase does not match the active phase");
            }
            (Some(current), None) => {
                report.push("project.currentPhase", "INCONSISTENT", format!("currentPhase '{current}' names no active phase"));
            }
            (None, Some(_)) => {
                report.push("project.currentPhase", "INCONSISTENT", "an active phase exists but currentPhase is unset");
            }
            _ => {}
        }
        let mut orders = HashSet::new();
        for phase in project.phases.values() {
            if !orders.insert(phase.order) {
                report.push("project.phases", "DUPLICATE_ORDER", format!("phase order {} is used more than once", phase.order));
            }
        }
        report
    }

    /// Exactly one open (cleared_at == None) focus-history row per active
    /// session, and that session's own `focus` field agrees with it.
    pub fn validate_session_focus(&self, sessions: &[Session]) -> ValidationReport {
        let mut report = ValidationReport::default();
        for session in sessions {
            if session.status != SessionStatus::Active {
                continue;
            }
            if session.focus.task_id.is_some() != session.focus.set_at.is_some() {
                report.push(
                    "session.focus",
                    "INCONSISTENT_FOCUS",
                    format!("session {} has a half-set focus", session.id),
                );
            }
        }
        report
    }

    // ---- Layer 4: state machine --------------------------------------

    pub fn validate_state_transition(&self, current: TaskStatus, new: TaskStatus) -> Result<()> {
        if current.can_transition_to(new) {
            Ok(())
        } else {
            Err(CleoError::invalid_transition(current, new))
        }
    }

    /// Circular-validation prevention for verification gate writes: the
    /// identifier of the task's creator may never be the validator or
    /// tester of the same gate; validator and tester must differ. The
    /// special identifiers `user`, `system`, `legacy` always bypass.
    pub fn validate_not_circular(
        &self,
        creator: &str,
        previous_gate_agent: Option<&str>,
        writer: &str,
    ) -> Result<()> {
        const BYPASS: [&str; 3] = ["user", "system", "legacy"];
        if BYPASS.contains(&writer) {
            return Ok(());
        }
        if writer == creator {
            return Err(CleoError::CircularValidation(format!(
                "agent '{writer}' created this task and cannot also validate it"
            )));
        }
        if let Some(prev) = previous_gate_agent {
            if !BYPASS.contains(&prev) && prev == writer {
                return Err(CleoError::CircularValidation(format!(
                    "agent '{writer}' already validated an earlier gate; validator and tester must differ"
                )));
            }
        }
        Ok(())
    }

    /// Required-gate subset used by `Verification::passed`; default is
    /// every gate except `cleanupDone`.
    pub fn default_required_gates() -> Vec<VerificationGate> {
        crate::models::GATE_CHAIN
            .into_iter()
            .filter(|g| *g != VerificationGate::CleanupDone)
            .collect()
    }
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, TaskType};
    use chrono::Utc;
    use std::collections::HashMap;

    fn task(id: u64, parent: Option<u64>) -> Task {
        let mut t = Task::new(TaskId::new(id), "t".into(), TaskType::Task, Utc::now());
        t.parent_id = parent.map(TaskId::new);
        t
    }

    #[test]
    fn rejects_empty_title() {
        let v = Validator::default();
        assert!(v.validate_title("").is_err());
        assert!(v.validate_title("ok").is_ok());
    }

    #[test]
    fn rejects_zero_width_title() {
        let v = Validator::default();
        assert!(v.validate_title("hello\u{200B}world").is_err());
    }

    #[test]
    fn rejects_file_paths_with_shell_metacharacters() {
        let v = Validator::default();
        assert!(v.validate_file_path("src/main.rs; rm -rf /").is_err());
        assert!(v.validate_file_path("src/main.rs").is_ok());
    }

    #[test]
    fn self_dependency_single_task_cycle() {
        let v = Validator::default();
        let mut tasks = HashMap::new();
        let mut t = task(1, None);
        t.depends.insert(TaskId::new(1));
        tasks.insert(t.id, t);
        let report = v.validate_references_and_cycles(&tasks);
        assert!(!report.valid());
    }

    #[test]
    fn depth_exceeding_rejected() {
        let v = Validator::default();
        let mut tasks = HashMap::new();
        tasks.insert(TaskId::new(1), task(1, None));
        tasks.insert(TaskId::new(2), task(2, Some(1)));
        tasks.insert(TaskId::new(3), task(3, Some(2)));
        tasks.insert(TaskId::new(4), task(4, Some(3)));
        let report = v.validate_references_and_cycles(&tasks);
        assert!(!report.valid());
    }

    #[test]
    fn circular_validation_blocks_creator() {
        let v = Validator::default();
        assert!(v.validate_not_circular("alpha", None, "alpha").is_err());
        assert!(v.validate_not_circular("alpha", None, "beta").is_ok());
        assert!(v.validate_not_circular("alpha", Some("beta"), "beta").is_err());
        assert!(v.validate_not_circular("alpha", Some("beta"), "system").is_ok());
    }
}
