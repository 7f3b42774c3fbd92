//! In-process router tests against a registry-backed workflow double.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use lodestone_api::{ApiServer, JobHandles};
use lodestone_core::{
    EngineDiagnostics, EngineReadiness, InitFailure, JobError, JobId, JobInspector, JobRecord,
    JobResult, JobWorkflow, MagnetSubmission, Registry, StatusRecord, Submitted,
};
use lodestone_fsops::DownloadGate;
use lodestone_telemetry::Metrics;
use serde_json::Value;
use tower::ServiceExt;

const MAGNET: &str =
    "magnet:?xt=urn:btih:0123456789ABCDEF0123456789ABCDEF01234567&dn=LinuxISO";
const TOKEN: &str = "operator-token";
const LISTEN_CHAIN: &str = "listen failed\n\nCaused by:\n    address in use";

type TestResult<T = ()> = Result<T, Box<dyn Error>>;

struct FakeJobs {
    registry: Registry,
    init_failure: Option<InitFailure>,
    introspection_fails: bool,
}

impl FakeJobs {
    fn failed_start() -> Self {
        Self {
            init_failure: Some(InitFailure::new("listen failed", LISTEN_CHAIN)),
            ..Self::healthy()
        }
    }

    fn healthy() -> Self {
        Self {
            registry: Registry::new(),
            init_failure: None,
            introspection_fails: false,
        }
    }
}

#[async_trait]
impl JobWorkflow for FakeJobs {
    async fn submit(&self, magnet: &str) -> JobResult<Submitted> {
        let submission = MagnetSubmission::parse(magnet)?;
        if let Some(failure) = &self.init_failure {
            return Err(JobError::EngineInit {
                failure: failure.clone(),
            });
        }
        let id = submission.provisional_id();
        self.registry.admit(JobRecord::adding(
            id.clone(),
            submission.display_name(),
        ));
        Ok(Submitted {
            id,
            name: submission.display_name().to_string(),
        })
    }

    async fn pause(&self, id: &JobId) -> JobResult<()> {
        self.registry
            .get(id)
            .map(|_| ())
            .ok_or_else(|| JobError::not_found(id))
    }

    async fn resume(&self, id: &JobId) -> JobResult<()> {
        self.pause(id).await
    }

    async fn remove(&self, id: &JobId) -> JobResult<()> {
        self.registry.remove(id)?;
        Ok(())
    }
}

#[async_trait]
impl JobInspector for FakeJobs {
    async fn list(&self) -> Vec<StatusRecord> {
        self.registry
            .snapshot()
            .iter()
            .map(StatusRecord::from_record)
            .collect()
    }

    async fn diagnostics(&self) -> JobResult<EngineDiagnostics> {
        if self.introspection_fails {
            return Err(JobError::InternalEngine {
                operation: "diagnostics",
                detail: "owner gone".to_string(),
            });
        }
        Ok(EngineDiagnostics {
            engine_version: self.init_failure.is_none().then(|| "loopback/test".to_string()),
            readiness: if self.init_failure.is_some() {
                EngineReadiness::Failed
            } else {
                EngineReadiness::Ready
            },
            init_failure: self.init_failure.clone(),
            counts: self.registry.counts(),
        })
    }
}

struct Harness {
    router: Router,
    root: tempfile::TempDir,
}

async fn harness(jobs: FakeJobs) -> TestResult<Harness> {
    let root = tempfile::tempdir()?;
    let gate = DownloadGate::open(root.path()).await?;
    let jobs = Arc::new(jobs);
    let server = ApiServer::new(
        JobHandles::new(jobs.clone(), jobs),
        gate,
        Metrics::new()?,
        Some(TOKEN.to_string()),
    );
    Ok(Harness {
        router: server.into_router(),
        root,
    })
}

async fn send(router: &Router, request: Request<Body>) -> TestResult<(StatusCode, Vec<u8>)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, body.to_vec()))
}

async fn send_json(router: &Router, request: Request<Body>) -> TestResult<(StatusCode, Value)> {
    let (status, body) = send(router, request).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

fn add_request(body: &str) -> TestResult<Request<Body>> {
    Ok(Request::post("/api/add")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?)
}

fn get(uri: &str) -> TestResult<Request<Body>> {
    Ok(Request::get(uri).body(Body::empty())?)
}

#[tokio::test]
async fn submission_is_listed_as_adding_immediately() -> TestResult {
    let harness = harness(FakeJobs::healthy()).await?;
    let body = serde_json::json!({ "magnet": MAGNET }).to_string();

    let (status, submitted) = send_json(&harness.router, add_request(&body)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["id"], "0123456789abcdef0123456789abcdef01234567");
    assert_eq!(submitted["name"], "LinuxISO");

    let (status, listing) = send_json(&harness.router, get("/api/torrents")?).await?;
    assert_eq!(status, StatusCode::OK);
    let records = listing.as_array().ok_or("listing is not an array")?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], submitted["id"]);
    assert_eq!(records[0]["state"], "adding");
    Ok(())
}

#[tokio::test]
async fn empty_and_malformed_submissions_are_problem_documents() -> TestResult {
    let harness = harness(FakeJobs::healthy()).await?;

    let (status, problem) = send_json(&harness.router, add_request(r#"{"magnet":""}"#)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["type"], "https://lodestone.dev/problems/bad-request");
    assert_eq!(problem["detail"], "no magnet link provided");
    assert_eq!(problem["invalid_params"][0]["pointer"], "/magnet");

    let (status, problem) = send_json(&harness.router, add_request("{not json")?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["status"], 400);

    let (status, _) = send_json(&harness.router, add_request(r#"{"magnet":"http://x"}"#)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listing) = send_json(&harness.router, get("/api/torrents")?).await?;
    assert_eq!(listing.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn init_failure_is_503_with_gated_diagnostic() -> TestResult {
    let harness = harness(FakeJobs::failed_start()).await?;
    let body = serde_json::json!({ "magnet": MAGNET }).to_string();

    for _ in 0..2 {
        let (status, problem) = send_json(&harness.router, add_request(&body)?).await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(problem["detail"], "engine failed to start: listen failed");
        assert!(problem.get("diagnostic").is_none());
    }

    let operator = Request::post("/api/add")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-lodestone-diagnostics-token", TOKEN)
        .body(Body::from(body))?;
    let (status, problem) = send_json(&harness.router, operator).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(problem["diagnostic"], LISTEN_CHAIN);
    Ok(())
}

#[tokio::test]
async fn actions_on_unknown_ids_are_not_found() -> TestResult {
    let harness = harness(FakeJobs::healthy()).await?;

    let pause = Request::post("/api/torrent/unknown/pause").body(Body::empty())?;
    let (status, problem) = send_json(&harness.router, pause).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["type"], "https://lodestone.dev/problems/not-found");

    let remove = Request::delete("/api/torrent/unknown/remove").body(Body::empty())?;
    let (status, _) = send_json(&harness.router, remove).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn remove_acknowledges_and_drops_record() -> TestResult {
    let harness = harness(FakeJobs::healthy()).await?;
    let body = serde_json::json!({ "magnet": MAGNET }).to_string();
    let (_, submitted) = send_json(&harness.router, add_request(&body)?).await?;
    let id = submitted["id"].as_str().ok_or("missing id")?;

    let remove = Request::delete(format!("/api/torrent/{id}/remove")).body(Body::empty())?;
    let (status, ack) = send_json(&harness.router, remove).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["ok"], true);

    let (_, listing) = send_json(&harness.router, get("/api/torrents")?).await?;
    assert_eq!(listing.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn downloads_are_contained_in_root() -> TestResult {
    let harness = harness(FakeJobs::healthy()).await?;
    std::fs::create_dir_all(harness.root.path().join("LinuxISO"))?;
    std::fs::write(harness.root.path().join("LinuxISO/disc.iso"), b"payload")?;

    let response = harness
        .router
        .clone()
        .oneshot(get("/api/download/abc/LinuxISO/disc.iso")?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok()),
        Some("attachment; filename=\"disc.iso\"")
    );
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"payload");

    let (status, problem) =
        send_json(&harness.router, get("/api/download/abc/../../secret")?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(problem["type"], "https://lodestone.dev/problems/forbidden");

    let (status, _) = send_json(&harness.router, get("/api/download/abc/missing.bin")?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn debug_reports_engine_and_root() -> TestResult {
    let harness = harness(FakeJobs::healthy()).await?;
    let (status, debug) = send_json(&harness.router, get("/api/debug")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(debug["engine_version"], "loopback/test");
    assert_eq!(debug["readiness"], "ready");
    assert_eq!(debug["download_root_writable"], true);
    assert_eq!(debug["counts"]["adding"], 0);
    Ok(())
}

#[tokio::test]
async fn debug_summarises_init_error_for_anonymous_callers() -> TestResult {
    let harness = harness(FakeJobs::failed_start()).await?;
    let (status, debug) = send_json(&harness.router, get("/api/debug")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(debug["readiness"], "failed");
    assert_eq!(debug["init_error"], "listen failed");

    let operator = Request::get("/api/debug")
        .header("x-lodestone-diagnostics-token", TOKEN)
        .body(Body::empty())?;
    let (_, debug) = send_json(&harness.router, operator).await?;
    assert_eq!(debug["init_error"], LISTEN_CHAIN);
    Ok(())
}

#[tokio::test]
async fn debug_introspection_failure_is_500() -> TestResult {
    let harness = harness(FakeJobs {
        introspection_fails: true,
        ..FakeJobs::healthy()
    })
    .await?;
    let (status, problem) = send_json(&harness.router, get("/api/debug")?).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(problem["type"], "https://lodestone.dev/problems/internal");
    Ok(())
}

#[tokio::test]
async fn health_and_metrics_are_exposed() -> TestResult {
    let harness = harness(FakeJobs::healthy()).await?;
    let (status, health) = send_json(&harness.router, get("/health")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let response = harness.router.clone().oneshot(get("/metrics")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/plain; version=0.0.4")
    );
    let body = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await?.to_vec())?;
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("route=\"/health\""));
    Ok(())
}
