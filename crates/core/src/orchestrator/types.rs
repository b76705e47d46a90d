//! Types for the enhancement orchestrator.

use thiserror::Error;

use crate::enhancement::{EnhancementStatus, StoreError};

/// Error message recorded when the hard deadline is exceeded.
pub const DEADLINE_EXCEEDED: &str = "deadline_exceeded";

/// Errors that escape the orchestrator.
///
/// Pipeline failures never surface here; they end in a `failed` record.
/// Only an unusable record store (or a broken state machine) does.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: EnhancementStatus,
        to: EnhancementStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::InvalidTransition {
            from: EnhancementStatus::Completed,
            to: EnhancementStatus::Updating,
        };
        assert_eq!(err.to_string(), "invalid transition: completed -> updating");

        let err: OrchestratorError = StoreError::Database("locked".to_string()).into();
        assert_eq!(err.to_string(), "record store error: Database error: locked");
    }
}
