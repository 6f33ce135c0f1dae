// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Result type alias for CLEO operations.
pub type Result<T> = std::result::Result<T, CleoError>;

/// Taxonomy of failures surfaced by CLEO.
///
/// Each variant maps to a stable exit-code family so the CLI and MCP
/// adapters can translate it without re-deriving the mapping.
///
/// # Examples
///
/// ```rust
/// use cleo_core::error::CleoError;
///
/// let err = CleoError::not_found("T42");
/// assert!(err.is_not_found());
/// assert_eq!(err.exit_code(), 3);
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CleoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("lock failed: {0}")]
    LockFailed(String),

    #[error("checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("circular validation: {0}")]
    CircularValidation(String),

    #[error("cascade threshold exceeded: {affected} descendants affected, threshold is {threshold}")]
    CascadeThresholdExceeded { affected: usize, threshold: usize },

    #[error("lifecycle gate blocked: {0}")]
    LifecycleGateBlocked(String),

    #[error("context limit: {0}")]
    ContextLimit(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CleoError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what}"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn empty_field(field: &str) -> Self {
        Self::Validation(format!("field '{field}' cannot be empty"))
    }

    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::StateConflict(format!("invalid state transition from {from} to {to}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CleoError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CleoError::Validation(_))
    }

    /// Machine-readable code used in the JSON response envelope's `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            CleoError::InvalidInput(_) => "INVALID_INPUT",
            CleoError::NotFound(_) => "NOT_FOUND",
            CleoError::Validation(_) => "VALIDATION_ERROR",
            CleoError::StateConflict(_) => "STATE_CONFLICT",
            CleoError::LockFailed(_) => "LOCK_FAILED",
            CleoError::ChecksumMismatch(_) => "CHECKSUM_MISMATCH",
            CleoError::CircularValidation(_) => "CIRCULAR_VALIDATION",
            CleoError::CascadeThresholdExceeded { .. } => "CASCADE_THRESHOLD_EXCEEDED",
            CleoError::LifecycleGateBlocked(_) => "LIFECYCLE_GATE_BLOCKED",
            CleoError::ContextLimit(_) => "CONTEXT_LIMIT",
            CleoError::Internal(_) => "INTERNAL",
        }
    }

    /// Exit code family: 0 success, 1 generic, 2 invalid
    /// input, 3-22 domain errors, 50-54 context-safeguard, 80 lifecycle gate
    /// block. The CLI/MCP front-ends pin the exact numeric values; this
    /// method returns the first code of each named family.
    pub fn exit_code(&self) -> i32 {
        match self {
            CleoError::InvalidInput(_) => 2,
            CleoError::NotFound(_) => 3,
            CleoError::Validation(_) => 4,
            CleoError::StateConflict(_) => 5,
            CleoError::LockFailed(_) => 6,
            CleoError::ChecksumMismatch(_) => 7,
            CleoError::CircularValidation(_) => 8,
            CleoError::CascadeThresholdExceeded { .. } => 9,
            CleoError::LifecycleGateBlocked(_) => 80,
            CleoError::ContextLimit(_) => 50,
            CleoError::Internal(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_roundtrip() {
        let err = CleoError::not_found("T42");
        assert!(err.is_not_found());
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn cascade_threshold_message() {
        let err = CleoError::CascadeThresholdExceeded {
            affected: 15,
            threshold: 10,
        };
        assert_eq!(
            err.to_string(),
            "cascade threshold exceeded: 15 descendants affected, threshold is 10"
        );
        assert_eq!(err.exit_code(), 9);
    }

    #[test]
    fn lifecycle_gate_blocked_exit_family() {
        let err = CleoError::LifecycleGateBlocked("testsPassed not set".into());
        assert_eq!(err.exit_code(), 80);
    }
}
