// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration resolver.
//!
//! Merge order: built-in defaults → `$CLEO_HOME/config.json` → the
//! project's `.cleo/config.json` → `CLEO_*` environment variables →
//! explicit CLI overrides. Every layer is optional; later layers win.
//! CLEO's own documents are JSON-native, so the merge is a small
//! `serde_json::Value` deep-merge rather than a multi-format config
//! loader.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::SizeStrategy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_hierarchy_depth: usize,
    pub cascade_threshold: usize,
    #[serde(with = "strategy_serde")]
    pub leverage_strategy: SizeStrategy,
    pub staleness_stale_days: i64,
    pub staleness_critical_days: i64,
    pub staleness_abandoned_days: i64,
    pub max_verification_rounds: u32,
    pub required_gates: Vec<crate::models::VerificationGate>,
    pub session_orphan_after_days: i64,
    pub allow_soft_scope_overlap: bool,
    pub track_tokens: bool,
    pub lock_timeout_secs: u64,
    pub backup_retention: usize,
}

mod strategy_serde {
    use super::SizeStrategy;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &SizeStrategy, s: S) -> Result<S::Ok, S::Error> {
        let name = match v {
            SizeStrategy::QuickWins => "quick-wins",
            SizeStrategy::BigImpact => "big-impact",
            SizeStrategy::Balanced => "balanced",
        };
        s.serialize_str(name)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SizeStrategy, D::Error> {
        let s = String::deserialize(d)?;
        Ok(match s.as_str() {
            "quick-wins" => SizeStrategy::QuickWins,
            "big-impact" => SizeStrategy::BigImpact,
            _ => SizeStrategy::Balanced,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_title_len: crate::validation::DEFAULT_MAX_TITLE_LEN,
            max_description_len: crate::validation::DEFAULT_MAX_DESCRIPTION_LEN,
            max_hierarchy_depth: crate::validation::DEFAULT_MAX_DEPTH,
            cascade_threshold: 10,
            leverage_strategy: SizeStrategy::Balanced,
            staleness_stale_days: 7,
            staleness_critical_days: 14,
            staleness_abandoned_days: 30,
            max_verification_rounds: 5,
            required_gates: crate::validation::Validator::default_required_gates(),
            session_orphan_after_days: 30,
            allow_soft_scope_overlap: true,
            track_tokens: true,
            lock_timeout_secs: 10,
            backup_retention: 10,
        }
    }
}

impl Config {
    /// Apply one JSON document layer on top of the current config, field
    /// by field; absent keys leave the current value untouched.
    pub fn merge_json(&mut self, layer: &serde_json::Value) {
        let Some(obj) = layer.as_object() else {
            return;
        };
        let mut current = serde_json::to_value(&*self).expect("Config always serializes");
        if let Some(current_obj) = current.as_object_mut() {
            for (k, v) in obj {
                current_obj.insert(k.clone(), v.clone());
            }
        }
        if let Ok(merged) = serde_json::from_value(current) {
            *self = merged;
        }
    }

    /// Apply `CLEO_*` environment overrides onto scalar fields.
    pub fn merge_env(&mut self, env: &HashMap<String, String>) {
        if let Some(v) = env.get("CLEO_CASCADE_THRESHOLD").and_then(|s| s.parse().ok()) {
            self.cascade_threshold = v;
        }
        if let Some(v) = env.get("CLEO_MAX_HIERARCHY_DEPTH").and_then(|s| s.parse().ok()) {
            self.max_hierarchy_depth = v;
        }
        if let Some(v) = env.get("CLEO_TRACK_TOKENS") {
            self.track_tokens = v == "1";
        }
    }

    /// Resolve defaults → global → project → env → CLI overrides, in order.
    pub fn resolve(
        global: Option<&serde_json::Value>,
        project: Option<&serde_json::Value>,
        env: &HashMap<String, String>,
        cli_overrides: Option<&serde_json::Value>,
    ) -> Self {
        let mut config = Config::default();
        if let Some(g) = global {
            config.merge_json(g);
        }
        if let Some(p) = project {
            config.merge_json(p);
        }
        config.merge_env(env);
        if let Some(c) = cli_overrides {
            config.merge_json(c);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layers_override_in_order() {
        let global = json!({ "cascadeThreshold": 5 });
        let project = json!({ "cascadeThreshold": 20 });
        let env = HashMap::new();
        let config = Config::resolve(Some(&global), Some(&project), &env, None);
        assert_eq!(config.cascade_threshold, 20);
    }

    #[test]
    fn env_overrides_file_layers() {
        let project = json!({ "cascadeThreshold": 20 });
        let mut env = HashMap::new();
        env.insert("CLEO_CASCADE_THRESHOLD".to_string(), "99".to_string());
        let config = Config::resolve(None, Some(&project), &env, None);
        assert_eq!(config.cascade_threshold, 99);
    }

    #[test]
    fn defaults_hold_when_no_layers_present() {
        let config = Config::resolve(None, None, &HashMap::new(), None);
        assert_eq!(config.cascade_threshold, 10);
        assert_eq!(config.leverage_strategy, SizeStrategy::Balanced);
    }
}
