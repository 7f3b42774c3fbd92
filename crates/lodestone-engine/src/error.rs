//! # Design
//!
//! - Constant messages; operational context lives in fields.
//! - Every variant folds into the job taxonomy at the orchestrator seam.

use lodestone_core::{InitFailure, JobError};
use thiserror::Error;

/// Errors surfaced by [`crate::EngineClient`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The owner has not finished initialising within the caller's wait.
    #[error("engine not ready")]
    NotReady,
    /// Initialisation failed; memoised for the life of the process.
    #[error("engine initialisation failed")]
    InitFailed {
        /// Captured failure.
        failure: InitFailure,
    },
    /// The command was not answered within the command timeout.
    #[error("engine command timed out")]
    Busy {
        /// Command identifier.
        operation: &'static str,
    },
    /// The owner task is no longer running.
    #[error("engine owner stopped")]
    OwnerStopped {
        /// Command identifier.
        operation: &'static str,
    },
    /// The engine session rejected or failed the call.
    #[error("engine session call failed")]
    Session {
        /// Command identifier.
        operation: &'static str,
        /// Engine-provided failure text.
        detail: String,
    },
}

impl EngineError {
    /// Split a start failure into its outermost message and full cause chain.
    pub(crate) fn init_failure(err: &anyhow::Error) -> InitFailure {
        InitFailure::new(err.to_string(), format!("{err:?}"))
    }

    pub(crate) fn session(operation: &'static str, err: &anyhow::Error) -> Self {
        Self::Session {
            operation,
            detail: format!("{err:#}"),
        }
    }
}

impl From<EngineError> for JobError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotReady => Self::EngineNotReady,
            EngineError::InitFailed { failure } => Self::EngineInit { failure },
            EngineError::Busy { operation } => Self::EngineBusy { operation },
            EngineError::OwnerStopped { operation } => Self::InternalEngine {
                operation,
                detail: "engine owner stopped".to_string(),
            },
            EngineError::Session { operation, detail } => {
                Self::InternalEngine { operation, detail }
            }
        }
    }
}

/// Convenience alias for engine client results.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_fold_into_job_taxonomy() {
        assert_eq!(JobError::from(EngineError::NotReady), JobError::EngineNotReady);
        assert_eq!(
            JobError::from(EngineError::Busy { operation: "add" }),
            JobError::EngineBusy { operation: "add" }
        );
        assert_eq!(
            JobError::from(EngineError::session("pause", &anyhow::anyhow!("invalid handle"))),
            JobError::InternalEngine {
                operation: "pause",
                detail: "invalid handle".to_string()
            }
        );
    }

    #[test]
    fn init_failure_keeps_cause_out_of_summary() {
        let err = anyhow::anyhow!("address already in use").context("failed to open listen socket");
        let failure = EngineError::init_failure(&err);
        assert_eq!(failure.summary, "failed to open listen socket");
        assert!(failure.detail.contains("address already in use"), "{}", failure.detail);
    }
}
