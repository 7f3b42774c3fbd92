//! Workflow and inspection traits implemented by the job orchestrator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::JobResult;
use crate::model::{EngineReadiness, JobCounts, JobId, StatusRecord, Submitted};

/// Mutating operations exposed to the HTTP surface.
#[async_trait]
pub trait JobWorkflow: Send + Sync {
    /// Accept a magnet submission and return its provisional identity without
    /// waiting for the engine add.
    async fn submit(&self, magnet: &str) -> JobResult<Submitted>;

    /// Pause an active job.
    async fn pause(&self, id: &JobId) -> JobResult<()>;

    /// Resume an active job.
    async fn resume(&self, id: &JobId) -> JobResult<()>;

    /// Remove a job from the registry (and the engine, when it reached it).
    async fn remove(&self, id: &JobId) -> JobResult<()>;
}

/// Read-only inspection of tracked jobs.
#[async_trait]
pub trait JobInspector: Send + Sync {
    /// Status of every tracked job. One unreadable job degrades its own entry
    /// and never fails the listing.
    async fn list(&self) -> Vec<StatusRecord>;

    /// Engine and registry diagnostics.
    async fn diagnostics(&self) -> JobResult<EngineDiagnostics>;
}

/// Memoised engine start failure.
///
/// `summary` is the outermost message and is safe for any caller. `detail`
/// carries the full cause chain and is reserved for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitFailure {
    /// Outermost error message.
    pub summary: String,
    /// Full cause chain.
    pub detail: String,
}

impl InitFailure {
    /// Pair a caller-safe summary with the full diagnostic.
    #[must_use]
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

/// Engine introspection used by the debug surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDiagnostics {
    /// Engine version string, once known.
    pub engine_version: Option<String>,
    /// Coarse readiness.
    pub readiness: EngineReadiness,
    /// Memoised initialisation failure, if any.
    pub init_failure: Option<InitFailure>,
    /// Registry population.
    pub counts: JobCounts,
}
