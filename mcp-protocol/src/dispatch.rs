// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed `(domain, operation)` dispatch table.
//!
//! Replaces dynamic string dispatch with one fixed match over known
//! `(domain, operation)` pairs; any unknown combination is rejected with
//! `INVALID_INPUT` at the boundary instead of reaching `cleo_core::ops`.

use cleo_core::{
    error::{CleoError, Result},
    models::{NewTask, Scope, SessionId, TaskFilter, TaskId, UpdateTask, VerificationGate},
    ops::Operation,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn parse<T: DeserializeOwned>(params: &Value) -> Result<T> {
    serde_json::from_value(params.clone()).map_err(|e| CleoError::InvalidInput(e.to_string()))
}

fn parse_task_id(params: &Value, field: &str) -> Result<TaskId> {
    let raw = params.get(field).and_then(Value::as_str).ok_or_else(|| {
        CleoError::InvalidInput(format!("missing required field '{field}'"))
    })?;
    raw.parse().map_err(|_| CleoError::InvalidInput(format!("'{raw}' is not a valid task id")))
}

fn parse_session_id(params: &Value, field: &str) -> Result<SessionId> {
    let raw = params.get(field).and_then(Value::as_str).ok_or_else(|| {
        CleoError::InvalidInput(format!("missing required field '{field}'"))
    })?;
    raw.to_string().try_into().map_err(|_| CleoError::InvalidInput(format!("'{raw}' is not a valid session id")))
}

fn child_strategy(params: &Value) -> cleo_core::models::ChildStrategy {
    params
        .get("strategy")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or(cleo_core::models::ChildStrategy::Block)
}

fn field_str(params: &Value, field: &str) -> Result<String> {
    params
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CleoError::InvalidInput(format!("missing required field '{field}'")))
}

/// Resolves one `{domain, operation, params}` triple into a typed
/// [`Operation`], or `INVALID_INPUT` if the combination isn't in the
/// table or `params` doesn't parse.
pub fn resolve(domain: &str, operation: &str, params: &Value) -> Result<Operation> {
    match (domain, operation) {
        ("task", "add") => Ok(Operation::Add(parse::<NewTask>(params)?)),
        ("task", "update") => Ok(Operation::Update { id: parse_task_id(params, "id")?, changes: parse::<UpdateTask>(params)? }),
        ("task", "show") => Ok(Operation::Show(parse_task_id(params, "id")?)),
        ("task", "list") => Ok(Operation::List(parse::<TaskFilter>(params)?)),
        ("task", "find") => Ok(Operation::Find(field_str(params, "query")?)),
        ("task", "complete") => Ok(Operation::Complete(parse_task_id(params, "id")?)),
        ("task", "reopen") => Ok(Operation::Reopen(parse_task_id(params, "id")?)),
        ("task", "cancel") => Ok(Operation::Cancel {
            id: parse_task_id(params, "id")?,
            reason: field_str(params, "reason")?,
            strategy: child_strategy(params),
            force: params.get("force").and_then(Value::as_bool).unwrap_or(false),
        }),
        ("task", "uncancel") => Ok(Operation::Uncancel(parse_task_id(params, "id")?)),
        ("task", "delete") => Ok(Operation::Delete {
            id: parse_task_id(params, "id")?,
            strategy: child_strategy(params),
            force: params.get("force").and_then(Value::as_bool).unwrap_or(false),
        }),
        ("task", "archive") => Ok(Operation::Archive(parse_task_id(params, "id")?)),
        ("task", "unarchive") => Ok(Operation::Unarchive(parse_task_id(params, "id")?)),
        ("task", "setGate") => Ok(Operation::SetGate {
            id: parse_task_id(params, "id")?,
            gate: parse::<VerificationGate>(&params.get("gate").cloned().ok_or_else(|| CleoError::InvalidInput("missing required field 'gate'".into()))?)?,
            value: params.get("value").and_then(Value::as_bool),
            agent: field_str(params, "agent")?,
            creator: field_str(params, "creator")?,
        }),

        ("focus", "set") => Ok(Operation::FocusSet { session_id: parse_session_id(params, "sessionId")?, task_id: parse_task_id(params, "taskId")? }),
        ("focus", "show") => Ok(Operation::FocusShow(parse_session_id(params, "sessionId")?)),
        ("focus", "clear") => Ok(Operation::FocusClear(parse_session_id(params, "sessionId")?)),

        ("session", "start") => Ok(Operation::SessionStart {
            name: field_str(params, "name")?,
            scope: parse::<Scope>(&params.get("scope").cloned().ok_or_else(|| CleoError::InvalidInput("missing required field 'scope'".into()))?)?,
            agent: params.get("agent").and_then(Value::as_str).map(str::to_string),
            id_suffix_hex: field_str(params, "idSuffixHex")?,
        }),
        ("session", "end") => Ok(Operation::SessionEnd(parse_session_id(params, "sessionId")?)),
        ("session", "suspend") => Ok(Operation::SessionSuspend(parse_session_id(params, "sessionId")?)),
        ("session", "resume") => Ok(Operation::SessionResume(parse_session_id(params, "sessionId")?)),
        ("session", "status") => Ok(Operation::SessionStatus(parse_session_id(params, "sessionId")?)),

        ("graph", "analyze") => Ok(Operation::Analyze {
            strategy: params
                .get("strategy")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or(cleo_core::graph::SizeStrategy::Balanced),
            current_phase: params.get("currentPhase").and_then(Value::as_str).map(str::to_string),
        }),
        ("graph", "deps") => Ok(Operation::Deps(parse_task_id(params, "id")?)),
        ("graph", "waves") => Ok(Operation::Waves),
        ("graph", "next") => Ok(Operation::Next),

        ("system", "validate") => Ok(Operation::Validate),
        ("system", "doctor") => Ok(Operation::Doctor),
        ("system", "migrate") => Ok(Operation::Migrate),

        ("orchestrator", "ready") => Ok(Operation::OrchestratorReady(parse_task_id(params, "epicId")?)),
        ("orchestrator", "next") => Ok(Operation::OrchestratorNext(parse_task_id(params, "epicId")?)),
        ("orchestrator", "spawn") => Ok(Operation::OrchestratorSpawn { epic_id: parse_task_id(params, "epicId")?, task_id: parse_task_id(params, "taskId")? }),

        ("metrics", "summary") => Ok(Operation::MetricsSummary),

        (domain, operation) => Err(CleoError::InvalidInput(format!("unknown operation '{domain}.{operation}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_domain_operation_pair_is_invalid_input() {
        let err = resolve("task", "teleport", &json!({})).unwrap_err();
        assert!(matches!(err, CleoError::InvalidInput(_)));
    }

    #[test]
    fn task_add_parses_new_task_payload() {
        let op = resolve("task", "add", &json!({"title": "Do the thing"})).unwrap();
        assert!(matches!(op, Operation::Add(t) if t.title == "Do the thing"));
    }

    #[test]
    fn task_show_requires_a_valid_task_id() {
        let err = resolve("task", "show", &json!({"id": "not-an-id"})).unwrap_err();
        assert!(matches!(err, CleoError::InvalidInput(_)));
    }

    #[test]
    fn graph_waves_and_next_ignore_params() {
        assert!(matches!(resolve("graph", "waves", &json!({})).unwrap(), Operation::Waves));
        assert!(matches!(resolve("graph", "next", &json!({})).unwrap(), Operation::Next));
    }
}
