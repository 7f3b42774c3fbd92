use std::future::Future;
use std::sync::Arc;

use lodestone_api::{ApiServer, JobHandles};
use lodestone_config::ServerConfig;
use lodestone_core::{JobInspector, JobWorkflow, Registry};
use lodestone_engine::{EngineClient, EngineOptions, SessionFactory, loopback_factory};
use lodestone_fsops::DownloadGate;
use lodestone_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, build_sha};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::orchestrator::{JobOrchestrator, OrchestratorSettings};

/// Entry point for the binary: load configuration, install logging, and serve
/// until Ctrl-C.
///
/// # Errors
///
/// Returns an error when configuration is invalid, logging cannot be installed,
/// the download root cannot be prepared, or the API listener fails.
pub async fn run_app() -> AppResult<()> {
    let config =
        ServerConfig::from_env().map_err(|err| AppError::config("server_config.from_env", err))?;
    let format = config
        .log_format
        .as_deref()
        .map_or_else(LogFormat::infer, LogFormat::parse_or_infer);
    lodestone_telemetry::init_logging(&LoggingConfig {
        level: &config.log_level,
        format,
        build_sha: build_sha(),
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    run_app_with(config, loopback_factory(), shutdown_signal()).await
}

/// Boot sequence over injected configuration, engine factory, and shutdown signal.
///
/// # Errors
///
/// See [`run_app`].
pub async fn run_app_with<F>(
    config: ServerConfig,
    factory: SessionFactory,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let _context = GlobalContextGuard::new("bootstrap");
    info!(build = build_sha(), "lodestone bootstrap starting");

    let telemetry =
        Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let gate = DownloadGate::open(&config.download_root)
        .await
        .map_err(|err| AppError::fsops("download_gate.open", err))?;
    info!(root = %gate.root().display(), "download root ready");

    let engine = EngineClient::spawn(
        factory,
        EngineOptions {
            settings: config.engine.clone(),
            alert_poll_interval: config.alert_poll_interval,
            command_timeout: config.command_timeout,
        },
        Some(telemetry.clone()),
    );
    let orchestrator = Arc::new(JobOrchestrator::new(
        engine,
        Arc::new(Registry::new()),
        telemetry.clone(),
        OrchestratorSettings {
            download_root: gate.root().to_path_buf(),
            sequential_download: config.engine.sequential_download,
            readiness_timeout: config.readiness_timeout,
        },
    ));
    let listener = orchestrator.spawn_event_listener();

    let workflow: Arc<dyn JobWorkflow> = orchestrator.clone();
    let inspector: Arc<dyn JobInspector> = orchestrator;
    let api = ApiServer::new(
        JobHandles::new(workflow, inspector),
        gate,
        telemetry,
        config.diagnostics_token.clone(),
    );

    let addr = config.socket_addr();
    info!(addr = %addr, "launching api listener");
    let serve_result = api.serve(addr, shutdown).await;

    listener.abort();
    if let Err(err) = listener.await {
        if !err.is_cancelled() {
            warn!(error = %err, "engine event listener join failed");
        }
    }

    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("api server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, TcpListener};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn boots_and_shuts_down_cleanly() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let config = ServerConfig {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: port,
            download_root: root.path().join("downloads"),
            ..ServerConfig::default()
        };
        run_app_with(
            config,
            loopback_factory(),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await?;
        assert!(root.path().join("downloads").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn unusable_download_root_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"not a directory")?;
        let config = ServerConfig {
            download_root: blocker.join("downloads"),
            ..ServerConfig::default()
        };
        let result = run_app_with(config, loopback_factory(), std::future::pending()).await;
        assert!(matches!(result, Err(AppError::FsOps { .. })));
        Ok(())
    }
}
