// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps `CleoError` to JSON-RPC 2.0 error codes.

use cleo_core::error::CleoError;
use serde_json::{json, Value};

/// One JSON-RPC error code per `CleoError` code family, offset from the
/// reserved `-32000..-32099` server-error range.
pub fn to_json_rpc_code(err: &CleoError) -> i32 {
    match err {
        CleoError::InvalidInput(_) => -32001,
        CleoError::NotFound(_) => -32002,
        CleoError::Validation(_) => -32003,
        CleoError::StateConflict(_) => -32004,
        CleoError::LockFailed(_) => -32005,
        CleoError::ChecksumMismatch(_) => -32006,
        CleoError::CircularValidation(_) => -32007,
        CleoError::CascadeThresholdExceeded { .. } => -32008,
        CleoError::LifecycleGateBlocked(_) => -32009,
        CleoError::ContextLimit(_) => -32010,
        CleoError::Internal(_) => -32011,
    }
}

pub fn to_json_rpc_error(err: &CleoError, id: Option<Value>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": { "code": to_json_rpc_code(err), "message": err.to_string() },
        "id": id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_dedicated_code() {
        assert_eq!(to_json_rpc_code(&CleoError::not_found("T1")), -32002);
    }

    #[test]
    fn json_rpc_error_carries_id_and_message() {
        let err = CleoError::validation("title too long");
        let rendered = to_json_rpc_error(&err, Some(json!(7)));
        assert_eq!(rendered["id"], 7);
        assert_eq!(rendered["error"]["code"], -32003);
    }
}
