//! Engine start failures surfaced through the full stack.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use lodestone_api::{ApiServer, JobHandles};
use lodestone_app::{JobOrchestrator, OrchestratorSettings};
use lodestone_config::EngineSettings;
use lodestone_core::{JobInspector, JobWorkflow, Registry};
use lodestone_engine::{EngineClient, EngineOptions, EngineSession, SessionFactory};
use lodestone_fsops::DownloadGate;
use lodestone_telemetry::Metrics;
use serde_json::Value;
use tower::ServiceExt;

const TOKEN: &str = "operator-token";
const MAGNET: &str = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567";

async fn failed_start_router(root: &tempfile::TempDir) -> Result<Router> {
    let factory: SessionFactory = Box::new(|_: &EngineSettings| -> Result<Box<dyn EngineSession>> {
        Err(anyhow!("address already in use").context("failed to open listen socket"))
    });
    let telemetry = Metrics::new()?;
    let engine = EngineClient::spawn(factory, EngineOptions::default(), Some(telemetry.clone()));
    let orchestrator = Arc::new(JobOrchestrator::new(
        engine,
        Arc::new(Registry::new()),
        telemetry.clone(),
        OrchestratorSettings {
            download_root: root.path().to_path_buf(),
            sequential_download: false,
            readiness_timeout: Duration::from_secs(2),
        },
    ));
    let workflow: Arc<dyn JobWorkflow> = orchestrator.clone();
    let inspector: Arc<dyn JobInspector> = orchestrator;
    let server = ApiServer::new(
        JobHandles::new(workflow, inspector),
        DownloadGate::open(root.path()).await?,
        telemetry,
        Some(TOKEN.to_string()),
    );
    Ok(server.into_router())
}

async fn send_json(router: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

fn add_request(token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::post("/api/add").header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("x-lodestone-diagnostics-token", token);
    }
    let body = serde_json::json!({ "magnet": MAGNET }).to_string();
    Ok(builder.body(Body::from(body))?)
}

fn debug_request(token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::get("/api/debug");
    if let Some(token) = token {
        builder = builder.header("x-lodestone-diagnostics-token", token);
    }
    Ok(builder.body(Body::empty())?)
}

#[tokio::test]
async fn start_failure_cause_is_withheld_from_anonymous_callers() -> Result<()> {
    let root = tempfile::tempdir()?;
    let router = failed_start_router(&root).await?;

    let (status, problem) = send_json(&router, add_request(None)?).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        problem["detail"],
        "engine failed to start: failed to open listen socket"
    );
    assert!(!problem.to_string().contains("address already in use"), "{problem}");

    let (status, problem) = send_json(&router, add_request(Some("wrong"))?).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(problem.get("diagnostic").is_none());

    let (_, debug) = send_json(&router, debug_request(None)?).await?;
    assert_eq!(debug["readiness"], "failed");
    assert_eq!(debug["init_error"], "failed to open listen socket");
    Ok(())
}

#[tokio::test]
async fn start_failure_cause_is_revealed_to_operators() -> Result<()> {
    let root = tempfile::tempdir()?;
    let router = failed_start_router(&root).await?;

    let (status, problem) = send_json(&router, add_request(Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let diagnostic = problem["diagnostic"].as_str().unwrap_or_default();
    assert!(diagnostic.contains("address already in use"), "{problem}");

    let (_, debug) = send_json(&router, debug_request(Some(TOKEN))?).await?;
    let init_error = debug["init_error"].as_str().unwrap_or_default();
    assert!(init_error.starts_with("failed to open listen socket"), "{debug}");
    assert!(init_error.contains("address already in use"), "{debug}");
    Ok(())
}
