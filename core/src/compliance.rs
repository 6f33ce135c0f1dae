// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest & compliance engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TaskId;

/// One subagent-produced manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    pub file: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, rename = "linked_tasks")]
    pub linked_tasks: Vec<TaskId>,
    pub status: String,
    #[serde(default)]
    pub findings_summary: Option<String>,
    #[serde(default)]
    pub key_findings: Option<Vec<String>>,
    pub agent_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestIntegrity {
    Valid,
    Partial,
    Invalid,
    Missing,
}

const REQUIRED_FIELDS: usize = 5; // id, title, file, status, agent_type

impl ManifestEntry {
    fn missing_field_count(&self) -> usize {
        let mut missing = 0;
        if self.id.is_empty() {
            missing += 1;
        }
        if self.title.is_empty() {
            missing += 1;
        }
        if self.file.is_empty() {
            missing += 1;
        }
        if self.status.is_empty() {
            missing += 1;
        }
        if self.agent_type.is_none() {
            missing += 1;
        }
        missing
    }

    pub fn integrity(&self) -> ManifestIntegrity {
        match self.missing_field_count() {
            0 => ManifestIntegrity::Valid,
            1..=2 => ManifestIntegrity::Partial,
            _ => ManifestIntegrity::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceScore {
    pub manifest_ok: bool,
    pub link_ok: bool,
    pub format_ok: bool,
    pub rule_adherence_score: f64,
    pub compliance_pass_rate: f64,
    pub severity: Severity,
    pub violations: Vec<String>,
}

const RETURN_FORMAT_MARKER: &str = "TASK COMPLETE:";

/// Scores a subagent return against the three compliance rules.
pub fn score(entry: Option<&ManifestEntry>, spawning_task: TaskId, return_text: &str) -> ComplianceScore {
    let manifest_ok = matches!(entry.map(|e| e.integrity()), Some(ManifestIntegrity::Valid));
    let link_ok = entry.map(|e| e.linked_tasks.contains(&spawning_task)).unwrap_or(false);
    let format_ok = return_text.contains(RETURN_FORMAT_MARKER);

    let passes = [manifest_ok, link_ok, format_ok].iter().filter(|p| **p).count();
    let rule_adherence_score = passes as f64 / 3.0;

    let mut violations = Vec::new();
    if entry.is_none() {
        violations.push("missing manifest entry".to_string());
    } else if !manifest_ok {
        violations.push("manifest entry is incomplete".to_string());
    }
    if !link_ok {
        violations.push(format!("manifest does not link back to {spawning_task}"));
    }
    if !format_ok {
        violations.push("return text does not match the required format".to_string());
    }

    let severity = if entry.is_none() {
        Severity::High
    } else if !violations.is_empty() {
        if violations.len() >= 2 {
            Severity::High
        } else {
            Severity::Medium
        }
    } else {
        Severity::Low
    };

    ComplianceScore {
        manifest_ok,
        link_ok,
        format_ok,
        rule_adherence_score,
        compliance_pass_rate: if violations.is_empty() { 1.0 } else { 0.0 },
        severity,
        violations,
    }
}

/// Gap analysis over a canonical docs corpus.
pub fn gap_analysis<'a>(topics: impl Iterator<Item = &'a str>, corpus: &str) -> Vec<String> {
    let corpus_lower = corpus.to_lowercase();
    topics
        .filter(|topic| !corpus_lower.contains(&topic.to_lowercase()))
        .map(|t| t.to_string())
        .collect()
}

pub fn ready_to_archive(gaps: &[String]) -> bool {
    gaps.is_empty()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceEvent {
    pub ts: DateTime<Utc>,
    pub task_id: TaskId,
    pub rule_adherence_score: f64,
    pub severity: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_entry() -> ManifestEntry {
        ManifestEntry {
            id: "m1".into(),
            title: "Findings".into(),
            file: "research/m1.md".into(),
            topics: vec!["auth".into()],
            linked_tasks: vec![TaskId::new(1)],
            status: "review".into(),
            findings_summary: Some("done".into()),
            key_findings: None,
            agent_type: Some("research".into()),
        }
    }

    #[test]
    fn missing_manifest_is_worst_severity() {
        let scored = score(None, TaskId::new(1), "TASK COMPLETE: done");
        assert_eq!(scored.severity, Severity::High);
        assert_eq!(scored.compliance_pass_rate, 0.0);
    }

    #[test]
    fn fully_compliant_return_scores_one() {
        let entry = complete_entry();
        let scored = score(Some(&entry), TaskId::new(1), "TASK COMPLETE: done");
        assert_eq!(scored.rule_adherence_score, 1.0);
        assert_eq!(scored.compliance_pass_rate, 1.0);
        assert_eq!(scored.severity, Severity::Low);
    }

    #[test]
    fn gap_analysis_flags_uncovered_topics() {
        let gaps = gap_analysis(["auth", "billing"].into_iter(), "the auth module handles login");
        assert_eq!(gaps, vec!["billing".to_string()]);
        assert!(!ready_to_archive(&gaps));
    }
}
