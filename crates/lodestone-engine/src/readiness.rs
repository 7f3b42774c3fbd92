//! Readiness signal published by the engine owner.

use serde::Serialize;

use lodestone_core::{EngineReadiness, InitFailure};

/// Lifecycle of engine initialisation. Transitions exactly once out of `Starting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Readiness {
    /// Initialisation has not finished.
    Starting,
    /// The session is up.
    Ready {
        /// Engine version string.
        version: String,
    },
    /// Initialisation failed; never retried.
    Failed {
        /// Captured failure.
        failure: InitFailure,
    },
}

impl Readiness {
    /// Whether initialisation has finished, successfully or not.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Starting)
    }

    /// Coarse label used by diagnostics.
    #[must_use]
    pub const fn coarse(&self) -> EngineReadiness {
        match self {
            Self::Starting => EngineReadiness::Starting,
            Self::Ready { .. } => EngineReadiness::Ready,
            Self::Failed { .. } => EngineReadiness::Failed,
        }
    }
}
