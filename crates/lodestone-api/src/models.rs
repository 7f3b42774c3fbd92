//! Request and response payloads for the HTTP surface.

use lodestone_core::{EngineReadiness, JobCounts};
use lodestone_telemetry::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Body accepted by `POST /api/add`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddJobRequest {
    /// Magnet URI to submit. A missing field is treated as empty.
    #[serde(default)]
    pub magnet: String,
}

/// Acknowledgement returned by job actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    /// Always `true` on success.
    pub ok: bool,
}

impl AckResponse {
    pub(crate) const OK: Self = Self { ok: true };
}

/// RFC9457 problem document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Caller-safe explanation.
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parameters that failed validation, if applicable.
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Raw diagnostic text, only for requests carrying the diagnostics token.
    pub diagnostic: Option<String>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON Pointer to the offending field.
    pub pointer: String,
    /// Human-readable description of the validation failure.
    pub message: String,
}

/// Payload of `GET /api/debug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugResponse {
    /// Engine version, once the engine is ready.
    pub engine_version: Option<String>,
    /// Coarse engine readiness.
    pub readiness: EngineReadiness,
    /// Memoised initialisation failure (first line unless the caller is an operator).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_error: Option<String>,
    /// Canonical download root.
    pub download_root: String,
    /// Whether the download root is a writable directory.
    pub download_root_writable: bool,
    /// Registry population by lifecycle.
    pub counts: JobCounts,
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// Build identifier.
    pub build: String,
    /// Coarse engine readiness.
    pub readiness: EngineReadiness,
    /// Subsystems that are not healthy.
    pub degraded: Vec<&'static str>,
    /// Selected metrics.
    pub metrics: MetricsSnapshot,
}
