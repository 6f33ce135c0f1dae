// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A task identifier, always of the shape `T<digits>`.
///
/// # Examples
///
/// ```rust
/// use cleo_core::models::TaskId;
///
/// let id = TaskId::new(42);
/// assert_eq!(id.to_string(), "T42");
/// assert_eq!(id.numeric(), 42);
/// ```
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn numeric(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('T')
            .ok_or_else(|| format!("task id '{s}' must start with 'T'"))?;
        let n: u64 = digits
            .parse()
            .map_err(|_| format!("task id '{s}' has a non-numeric suffix"))?;
        Ok(Self(n))
    }
}

impl TryFrom<String> for TaskId {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.to_string()
    }
}

/// Task lifecycle states.
///
/// Created `pending` -> may become `active` -> `blocked` or back to
/// `active` -> `done` (reversible via reopen) or `cancelled` (reversible
/// via uncancel).
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Active,
    Blocked,
    Done,
    Cancelled,
}

impl TaskStatus {
    /// Legal status transitions (state machine).
    /// Same-state transitions are always legal (idempotence).
    pub fn can_transition_to(&self, new: TaskStatus) -> bool {
        use TaskStatus::*;
        if *self == new {
            return true;
        }
        matches!(
            (self, new),
            (Pending, Active)
                | (Active, Pending)
                | (Active, Blocked)
                | (Blocked, Active)
                | (Blocked, Pending)
                | (Pending, Blocked)
                | (Active, Done)
                | (Done, Pending) // reopen
                | (_, Cancelled) // cancel from any state
                | (Cancelled, _) // uncancel back to any prior state
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Active => "active",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Epic,
    Task,
    Subtask,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Task
    }
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskSize {
    Small,
    Medium,
    Large,
}

/// A relationship to another task (`relates`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub task_id: TaskId,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    RelatesTo,
    SpawnedFrom,
    DeferredTo,
    Supersedes,
    Duplicates,
}

/// One append-only note on a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub ts: DateTime<Utc>,
    pub text: String,
}

/// Ordered verification gate chain.
pub const GATE_CHAIN: [VerificationGate; 6] = [
    VerificationGate::Implemented,
    VerificationGate::TestsPassed,
    VerificationGate::QaPassed,
    VerificationGate::CleanupDone,
    VerificationGate::SecurityPassed,
    VerificationGate::Documented,
];

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum VerificationGate {
    Implemented,
    TestsPassed,
    QaPassed,
    CleanupDone,
    SecurityPassed,
    Documented,
}

impl VerificationGate {
    pub fn index(&self) -> usize {
        GATE_CHAIN.iter().position(|g| g == self).expect("gate in chain")
    }

    pub fn predecessor(&self) -> Option<VerificationGate> {
        let i = self.index();
        if i == 0 {
            None
        } else {
            Some(GATE_CHAIN[i - 1])
        }
    }
}

/// A single failed verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationFailure {
    pub gate: VerificationGate,
    pub agent: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub round: u32,
}

/// Verification state for a single task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Verification {
    pub gates: BTreeMap<VerificationGate, Option<bool>>,
    /// Agent that last wrote each gate, used for circular-validation checks.
    pub gate_agents: BTreeMap<VerificationGate, String>,
    pub failures: Vec<VerificationFailure>,
    pub round: u32,
}

impl Verification {
    /// `passed` per the configured required-gate subset (default: all gates
    /// except `cleanupDone`).
    pub fn passed(&self, required: &[VerificationGate]) -> bool {
        required
            .iter()
            .all(|g| self.gates.get(g).copied().flatten().unwrap_or(false))
    }
}

/// Core task representation in CLEO.
///
/// # Examples
///
/// ```rust
/// use cleo_core::models::{Task, TaskId, TaskStatus, TaskType};
/// use chrono::Utc;
///
/// let task = Task::new(TaskId::new(1), "Implement auth".into(), TaskType::Task, Utc::now());
/// assert_eq!(task.status, TaskStatus::Pending);
/// assert!(task.status.can_transition_to(TaskStatus::Active));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub depends: BTreeSet<TaskId>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<TaskSize>,
    #[serde(default)]
    pub files: BTreeSet<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub verification: Verification,
    #[serde(default)]
    pub relates: Vec<Relation>,
    pub blocked_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Free-text scratchpad an agent can attach to a task; not validated
    /// beyond length, never drives any state machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_context: Option<String>,
}

impl Task {
    pub fn new(id: TaskId, title: String, task_type: TaskType, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            task_type,
            parent_id: None,
            depends: BTreeSet::new(),
            labels: BTreeSet::new(),
            phase: None,
            size: None,
            files: BTreeSet::new(),
            notes: Vec::new(),
            verification: Verification::default(),
            relates: Vec::new(),
            blocked_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            agent_context: None,
        }
    }

    pub fn is_epic(&self) -> bool {
        matches!(self.task_type, TaskType::Epic)
    }
}

/// Creation payload for a new task.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub task_type: TaskType,
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub depends: BTreeSet<TaskId>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    pub phase: Option<String>,
    pub size: Option<TaskSize>,
    #[serde(default)]
    pub files: BTreeSet<String>,
}

/// Update payload; every field is optional so only supplied fields change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub parent_id: Option<Option<TaskId>>,
    pub depends: Option<BTreeSet<TaskId>>,
    pub labels: Option<BTreeSet<String>>,
    pub phase: Option<Option<String>>,
    pub size: Option<Option<TaskSize>>,
    pub files: Option<BTreeSet<String>>,
    pub agent_context: Option<Option<String>>,
}

/// Filter criteria for `list`/`find`, combined with AND logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub task_type: Option<TaskType>,
    pub phase: Option<String>,
    pub label: Option<String>,
    pub parent_id: Option<TaskId>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Child-handling strategy for cancel/delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChildStrategy {
    Block,
    Cascade,
    Orphan,
}

// ---------------------------------------------------------------------
// Project & phases
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub order: i64,
    pub status: PhaseStatus,
    pub name: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseHistoryEntry {
    pub name: String,
    pub status: PhaseStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub phases: BTreeMap<String, Phase>,
    pub current_phase: Option<String>,
    #[serde(default)]
    pub phase_history: Vec<PhaseHistoryEntry>,
}

// ---------------------------------------------------------------------
// Sessions & focus
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn new(timestamp: DateTime<Utc>, suffix_hex: &str) -> Self {
        Self(format!(
            "session_{}_{}",
            timestamp.format("%Y%m%d_%H%M%S"),
            suffix_hex
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("session_") {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("session id '{s}' must start with 'session_'"))
        }
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Suspended,
    Ended,
    Orphaned,
}

/// A session's authority to touch part of the task graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scope {
    Global,
    Epic { epic_id: TaskId },
    Subtree { root_id: TaskId },
    Custom { label: String },
}

impl Scope {
    /// HARD conflict: identical scope, or one subtree-contains the other.
    pub fn hard_conflicts_with(&self, other: &Scope) -> bool {
        use Scope::*;
        match (self, other) {
            (Global, Global) => true,
            (Epic { epic_id: a }, Epic { epic_id: b }) => a == b,
            (Subtree { root_id: a }, Subtree { root_id: b }) => a == b,
            (Custom { label: a }, Custom { label: b }) => a == b,
            // An epic scope and a subtree scope rooted at the same task id
            // are the same subtree for conflict purposes.
            (Epic { epic_id: a }, Subtree { root_id: b })
            | (Subtree { root_id: b }, Epic { epic_id: a }) => a == b,
            _ => false,
        }
    }

    /// SOFT overlap: shares a common ancestor (conservatively: global vs.
    /// any scoped session; two scoped sessions that are not a hard
    /// conflict are treated as unrelated — a fixed definition, not a
    /// heuristic).
    pub fn soft_overlaps_with(&self, other: &Scope) -> bool {
        if self.hard_conflicts_with(other) {
            return false;
        }
        matches!((self, other), (Scope::Global, _) | (_, Scope::Global))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Focus {
    pub task_id: Option<TaskId>,
    pub set_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub status: SessionStatus,
    pub scope: Scope,
    pub focus: Focus,
    pub agent: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub tasks_completed: Vec<TaskId>,
    #[serde(default)]
    pub tasks_created: Vec<TaskId>,
}

/// One row of a session's append-only focus history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FocusHistoryEntry {
    pub task_id: TaskId,
    pub set_at: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_round_trips() {
        let id: TaskId = "T42".parse().unwrap();
        assert_eq!(id.numeric(), 42);
        assert_eq!(id.to_string(), "T42");
        assert!("T".parse::<TaskId>().is_err());
        assert!("X1".parse::<TaskId>().is_err());
    }

    #[test]
    fn status_transitions_match_state_machine() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Blocked));
        assert!(Blocked.can_transition_to(Active));
        assert!(Active.can_transition_to(Done));
        assert!(Done.can_transition_to(Pending)); // reopen
        assert!(Active.can_transition_to(Cancelled));
        assert!(Cancelled.can_transition_to(Active)); // uncancel
        assert!(Pending.can_transition_to(Pending)); // idempotent
        assert!(!Done.can_transition_to(Blocked));
    }

    #[test]
    fn gate_chain_predecessors() {
        assert_eq!(VerificationGate::Implemented.predecessor(), None);
        assert_eq!(
            VerificationGate::TestsPassed.predecessor(),
            Some(VerificationGate::Implemented)
        );
        assert_eq!(
            VerificationGate::Documented.predecessor(),
            Some(VerificationGate::SecurityPassed)
        );
    }

    #[test]
    fn scope_hard_conflict_rules() {
        let e1 = Scope::Epic { epic_id: TaskId::new(1) };
        let e1b = Scope::Epic { epic_id: TaskId::new(1) };
        let e2 = Scope::Epic { epic_id: TaskId::new(2) };
        assert!(e1.hard_conflicts_with(&e1b));
        assert!(!e1.hard_conflicts_with(&e2));
        assert!(Scope::Global.hard_conflicts_with(&Scope::Global));
        assert!(Scope::Global.soft_overlaps_with(&e1));
    }
}
