//! Operator diagnostics endpoint.

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap};
use tracing::error;

use crate::http::errors::ApiError;
use crate::models::DebugResponse;
use crate::state::ApiState;

pub(crate) async fn debug_info(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<DebugResponse>, ApiError> {
    let operator = state.diagnostics_allowed(&headers);
    let diagnostics = state.jobs.inspector().diagnostics().await.map_err(|err| {
        error!(error = %err, "engine introspection failed");
        ApiError::internal("engine introspection failed").revealing(operator)
    })?;

    let init_error = diagnostics.init_failure.map(|failure| {
        if operator {
            failure.detail
        } else {
            failure.summary
        }
    });

    Ok(Json(DebugResponse {
        engine_version: diagnostics.engine_version,
        readiness: diagnostics.readiness,
        init_error,
        download_root: state.gate.root().display().to_string(),
        download_root_writable: state.gate.root_writable().await,
        counts: diagnostics.counts,
    }))
}
