// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The JSON response envelope every operation returns.
//!
//! CLI and MCP are two adapters over the same [`cleo_core::ops::execute`]
//! call and both render through this one envelope so a caller can't tell
//! which adapter produced a response.

use chrono::{DateTime, Utc};
use cleo_core::error::CleoError;
use serde_json::{json, Value};

pub const SCHEMA: &str = "https://cleo.dev/schema/response-envelope-v1.json";

pub struct EnvelopeMeta {
    pub cmd: String,
    pub ts: DateTime<Utc>,
    pub version: &'static str,
}

pub fn success(meta: EnvelopeMeta, data: Value) -> Value {
    json!({
        "$schema": SCHEMA,
        "_meta": { "cmd": meta.cmd, "ts": meta.ts, "version": meta.version },
        "success": true,
        "data": data,
    })
}

pub fn failure(meta: EnvelopeMeta, err: &CleoError, fix: Option<&str>) -> Value {
    json!({
        "$schema": SCHEMA,
        "_meta": { "cmd": meta.cmd, "ts": meta.ts, "version": meta.version },
        "success": false,
        "error": {
            "code": err.code(),
            "message": err.to_string(),
            "fix": fix,
            "exitCode": err.exit_code(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_carries_data_and_no_error_key() {
        let meta = EnvelopeMeta { cmd: "task.show".into(), ts: Utc::now(), version: "0.1.0" };
        let envelope = success(meta, json!({"id": "T1"}));
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["id"], "T1");
        assert!(envelope.get("error").is_none());
    }

    #[test]
    fn failure_envelope_carries_exit_code() {
        let meta = EnvelopeMeta { cmd: "task.show".into(), ts: Utc::now(), version: "0.1.0" };
        let err = CleoError::not_found("T9");
        let envelope = failure(meta, &err, Some("run `cleo list` to see valid ids"));
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"]["code"], "NOT_FOUND");
        assert_eq!(envelope["error"]["exitCode"], 3);
    }
}
