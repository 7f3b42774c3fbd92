//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    middleware,
    routing::{delete, get, post},
};
use lodestone_fsops::DownloadGate;
use lodestone_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::JobHandles;
use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::{HEADER_DIAGNOSTICS_TOKEN, HEADER_REQUEST_ID};
use crate::http::debug::debug_info;
use crate::http::download::download_file;
use crate::http::health::{health, metrics};
use crate::http::jobs::{add_job, list_jobs, pause_job, remove_job, resume_job};
use crate::http::telemetry::track_requests;
use crate::state::ApiState;

/// Axum router wrapper that hosts the Lodestone API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire handlers, middleware, and shared state into a router.
    #[must_use]
    pub fn new(
        jobs: JobHandles,
        gate: DownloadGate,
        telemetry: Metrics,
        diagnostics_token: Option<String>,
    ) -> Self {
        let state = Arc::new(ApiState::new(jobs, gate, telemetry, diagnostics_token));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                CONTENT_TYPE,
                HeaderName::from_static(HEADER_REQUEST_ID),
                HeaderName::from_static(HEADER_DIAGNOSTICS_TOKEN),
            ]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(lodestone_telemetry::propagate_request_id_layer())
            .layer(lodestone_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(
                Arc::clone(&state),
                track_requests,
            ));

        let router = Self::routes()
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);
        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/api/add", post(add_job))
            .route("/api/torrents", get(list_jobs))
            .route("/api/torrent/{id}/pause", post(pause_job))
            .route("/api/torrent/{id}/resume", post(resume_job))
            .route("/api/torrent/{id}/remove", delete(remove_job))
            .route("/api/download/{id}/{*path}", get(download_file))
            .route("/api/debug", get(debug_info))
    }

    /// Serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Bind`] when the listener cannot be bound and
    /// [`ApiServerError::Serve`] when the server loop fails.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(%addr, "starting api");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    /// Router with all layers applied, for in-process use.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}
