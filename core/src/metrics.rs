// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{SessionId, TaskId};

/// `tokens ≈ ceil(chars / 4)`, the universal fallback.
pub fn estimate_tokens(text: &str) -> u64 {
    ((text.chars().count() as f64) / 4.0).ceil() as u64
}

pub fn estimate_tokens_for_file_size(byte_len: u64) -> u64 {
    ((byte_len as f64) / 4.0).ceil() as u64
}

/// One exported OpenTelemetry data point, as parsed from the most recent
/// exporter JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtelDataPoint {
    pub attribute: String, // "input" | "output" | "cacheRead" | "cacheCreation"
    pub value: u64,
}

/// Sums `claude_code.token.usage` data points by attribute. When present,
/// this measurement is authoritative over the chars/4 estimate.
pub fn measure_from_otel(points: &[OtelDataPoint]) -> HashMap<String, u64> {
    let mut totals = HashMap::new();
    for p in points {
        *totals.entry(p.attribute.clone()).or_insert(0) += p.value;
    }
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEventKind {
    SessionStart,
    SessionEnd,
    SpawnPrompt,
    SpawnReturn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenUsageEvent {
    pub ts: DateTime<Utc>,
    pub event: String,
    pub tokens: u64,
    pub measured: bool,
    pub task_id: Option<TaskId>,
    pub session_id: Option<SessionId>,
}

impl TokenUsageEvent {
    pub fn new(kind: TokenEventKind, tokens: u64, measured: bool, now: DateTime<Utc>) -> Self {
        let event = match kind {
            TokenEventKind::SessionStart => "SESSION_START",
            TokenEventKind::SessionEnd => "SESSION_END",
            TokenEventKind::SpawnPrompt => "SPAWN_PROMPT",
            TokenEventKind::SpawnReturn => "SPAWN_RETURN",
        };
        Self {
            ts: now,
            event: event.to_string(),
            tokens,
            measured,
            task_id: None,
            session_id: None,
        }
    }
}

/// `consumed = end - start` at the session tier.
pub fn session_consumed(start_tokens: u64, end_tokens: u64) -> u64 {
    end_tokens.saturating_sub(start_tokens)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbVerdict {
    pub token_delta: i64,
    pub per_task_efficiency_delta: f64,
    pub validation_pass_rate_delta: f64,
    pub verdict: String,
}

pub struct AbArm {
    pub tokens_consumed: u64,
    pub tasks_completed: u64,
    pub validation_pass_rate: f64,
}

/// Compares a `cleo` arm against a `baseline` arm once both sessions end.
pub fn ab_compare(cleo: &AbArm, baseline: &AbArm, improvement_threshold: f64) -> AbVerdict {
    let token_delta = cleo.tokens_consumed as i64 - baseline.tokens_consumed as i64;

    let cleo_efficiency = if cleo.tasks_completed > 0 {
        cleo.tokens_consumed as f64 / cleo.tasks_completed as f64
    } else {
        0.0
    };
    let baseline_efficiency = if baseline.tasks_completed > 0 {
        baseline.tokens_consumed as f64 / baseline.tasks_completed as f64
    } else {
        0.0
    };
    let per_task_efficiency_delta = baseline_efficiency - cleo_efficiency;
    let validation_pass_rate_delta = cleo.validation_pass_rate - baseline.validation_pass_rate;

    let verdict = if per_task_efficiency_delta / baseline_efficiency.max(1.0) >= improvement_threshold {
        "cleo_improved".to_string()
    } else if per_task_efficiency_delta < 0.0 {
        "cleo_regressed".to_string()
    } else {
        "inconclusive".to_string()
    };

    AbVerdict {
        token_delta,
        per_task_efficiency_delta,
        validation_pass_rate_delta,
        verdict,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalAggregateEvent {
    pub ts: DateTime<Utc>,
    pub project: String,
    pub source_id: String,
    pub payload: serde_json::Value,
}

/// Dedup by `(timestamp, sourceId)` during sync to the global stream.
pub fn deduplicate_for_sync(events: Vec<GlobalAggregateEvent>) -> Vec<GlobalAggregateEvent> {
    let mut seen = std::collections::HashSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert((e.ts, e.source_id.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens("abcde"), 2); // 5/4 = 1.25 -> 2
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn otel_measurement_sums_by_attribute() {
        let points = vec![
            OtelDataPoint { attribute: "input".into(), value: 100 },
            OtelDataPoint { attribute: "input".into(), value: 50 },
            OtelDataPoint { attribute: "output".into(), value: 30 },
        ];
        let totals = measure_from_otel(&points);
        assert_eq!(totals["input"], 150);
        assert_eq!(totals["output"], 30);
    }

    #[test]
    fn dedup_drops_repeated_timestamp_source_pairs() {
        let ts = Utc::now();
        let events = vec![
            GlobalAggregateEvent { ts, project: "p".into(), source_id: "a".into(), payload: serde_json::json!({}) },
            GlobalAggregateEvent { ts, project: "p".into(), source_id: "a".into(), payload: serde_json::json!({}) },
        ];
        assert_eq!(deduplicate_for_sync(events).len(), 1);
    }
}
