//! Health and metrics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use lodestone_core::EngineReadiness;
use lodestone_telemetry::build_sha;
use tracing::{error, warn};

use crate::http::constants::METRICS_CONTENT_TYPE;
use crate::http::errors::ApiError;
use crate::models::HealthResponse;
use crate::state::ApiState;

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let mut degraded = Vec::new();
    let readiness = match state.jobs.inspector().diagnostics().await {
        Ok(diagnostics) => diagnostics.readiness,
        Err(err) => {
            warn!(error = %err, "engine introspection failed during health check");
            EngineReadiness::Failed
        }
    };
    if readiness != EngineReadiness::Ready {
        degraded.push("engine");
    }
    if !state.gate.root_writable().await {
        degraded.push("download_root");
    }

    Json(HealthResponse {
        status: if degraded.is_empty() { "ok" } else { "degraded" },
        build: build_sha().to_string(),
        readiness,
        degraded,
        metrics: state.telemetry.snapshot(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::CONTENT_TYPE, METRICS_CONTENT_TYPE)
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
