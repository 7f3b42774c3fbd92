//! Job submission, listing, and action handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path as AxumPath, State, rejection::JsonRejection},
    http::HeaderMap,
};
use lodestone_core::{JobId, StatusRecord, Submitted};
use tracing::info;

use crate::http::errors::ApiError;
use crate::models::{AckResponse, AddJobRequest};
use crate::state::ApiState;

pub(crate) async fn add_job(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<AddJobRequest>, JsonRejection>,
) -> Result<Json<Submitted>, ApiError> {
    let Json(request) = payload?;
    let submitted = state
        .jobs
        .workflow()
        .submit(&request.magnet)
        .await
        .map_err(|err| ApiError::from(err).revealing(state.diagnostics_allowed(&headers)))?;
    info!(job_id = %submitted.id, job_name = %submitted.name, "job submission accepted");
    Ok(Json(submitted))
}

pub(crate) async fn list_jobs(State(state): State<Arc<ApiState>>) -> Json<Vec<StatusRecord>> {
    Json(state.jobs.inspector().list().await)
}

pub(crate) async fn pause_job(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AckResponse>, ApiError> {
    let id = JobId::new(id);
    state
        .jobs
        .workflow()
        .pause(&id)
        .await
        .map_err(|err| ApiError::from(err).revealing(state.diagnostics_allowed(&headers)))?;
    info!(job_id = %id, "job paused");
    Ok(Json(AckResponse::OK))
}

pub(crate) async fn resume_job(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AckResponse>, ApiError> {
    let id = JobId::new(id);
    state
        .jobs
        .workflow()
        .resume(&id)
        .await
        .map_err(|err| ApiError::from(err).revealing(state.diagnostics_allowed(&headers)))?;
    info!(job_id = %id, "job resumed");
    Ok(Json(AckResponse::OK))
}

pub(crate) async fn remove_job(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AckResponse>, ApiError> {
    let id = JobId::new(id);
    state
        .jobs
        .workflow()
        .remove(&id)
        .await
        .map_err(|err| ApiError::from(err).revealing(state.diagnostics_allowed(&headers)))?;
    info!(job_id = %id, "job removed");
    Ok(Json(AckResponse::OK))
}
