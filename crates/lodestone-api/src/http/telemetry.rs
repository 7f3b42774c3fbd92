//! Per-request metrics and request context.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use lodestone_telemetry::with_request_context;

use crate::http::constants::HEADER_REQUEST_ID;
use crate::state::ApiState;

/// Count the request under its route template and expose its id and route to
/// everything the handler logs.
pub(crate) async fn track_requests(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |matched| matched.as_str().to_string());
    let request_id = request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = with_request_context(request_id, route.clone(), next.run(request)).await;
    state
        .telemetry
        .inc_http_request(&route, response.status().as_u16());
    response
}
