//! Streams completed files from the download root.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path as AxumPath, Request, State},
    http::{HeaderValue, header::CONTENT_DISPOSITION},
    response::Response,
};
use lodestone_core::JobId;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error};

use crate::http::errors::ApiError;
use crate::state::ApiState;

/// `GET /api/download/{id}/{*path}`: the path is checked against the download
/// root before anything is opened.
pub(crate) async fn download_file(
    State(state): State<Arc<ApiState>>,
    AxumPath((id, relative)): AxumPath<(String, String)>,
    request: Request,
) -> Result<Response, ApiError> {
    let id = JobId::new(id);
    let resolved = state.gate.resolve(&id, &relative).await?;

    let response = match ServeFile::new(&resolved).oneshot(request).await {
        Ok(response) => response,
        Err(infallible) => match infallible {},
    };
    let mut response = response.map(Body::new);
    if response.status().is_success() {
        if let Some(disposition) = resolved
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(attachment_header)
        {
            response
                .headers_mut()
                .insert(CONTENT_DISPOSITION, disposition);
        }
    } else if response.status().is_server_error() {
        error!(job_id = %id, path = %resolved.display(), status = response.status().as_u16(), "download failed");
    }
    debug!(job_id = %id, path = %resolved.display(), status = response.status().as_u16(), "download served");
    Ok(response)
}

fn attachment_header(name: &str) -> Option<HeaderValue> {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{escaped}\"")).ok()
}
