//! Error types for job control operations.

use thiserror::Error;

use crate::model::JobId;
use crate::service::InitFailure;

/// Primary error type for job operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    /// The submission was missing or malformed.
    #[error("submission rejected")]
    Validation {
        /// Short, caller-safe reason.
        reason: &'static str,
    },
    /// The engine did not report readiness within the allotted wait.
    #[error("engine not ready")]
    EngineNotReady,
    /// Engine initialisation failed; memoised until restart.
    #[error("engine failed to start")]
    EngineInit {
        /// Captured failure from the start attempt.
        failure: InitFailure,
    },
    /// No record exists for the identity (or it is not in a state that accepts the call).
    #[error("job not found")]
    NotFound {
        /// Identity that was looked up.
        id: String,
    },
    /// An engine call failed unexpectedly.
    #[error("engine operation failed")]
    InternalEngine {
        /// Operation identifier.
        operation: &'static str,
        /// Engine-provided failure text.
        detail: String,
    },
    /// Another record already holds the identity.
    #[error("job identity already registered")]
    DuplicateIdentity {
        /// Contested identity.
        id: String,
    },
    /// The engine owner did not answer within the command timeout.
    #[error("engine busy")]
    EngineBusy {
        /// Operation identifier.
        operation: &'static str,
    },
}

impl JobError {
    /// Build a not-found error for the supplied identity.
    #[must_use]
    pub fn not_found(id: &JobId) -> Self {
        Self::NotFound {
            id: id.as_str().to_string(),
        }
    }
}

/// Failures reported by [`crate::registry::Registry`] mutations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Insert or replace target already present.
    #[error("identity already present in registry")]
    DuplicateIdentity {
        /// Contested identity.
        id: JobId,
    },
    /// No record is stored under the identity.
    #[error("identity not present in registry")]
    NotFound {
        /// Missing identity.
        id: JobId,
    },
    /// A record exists but belongs to a different submission attempt.
    #[error("record belongs to a different submission")]
    StaleSubmission {
        /// Identity whose record was superseded.
        id: JobId,
    },
}

impl From<RegistryError> for JobError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateIdentity { id } => Self::DuplicateIdentity {
                id: id.into_string(),
            },
            RegistryError::NotFound { id } | RegistryError::StaleSubmission { id } => {
                Self::NotFound {
                    id: id.into_string(),
                }
            }
        }
    }
}

/// Convenience alias for job operation results.
pub type JobResult<T> = Result<T, JobError>;
