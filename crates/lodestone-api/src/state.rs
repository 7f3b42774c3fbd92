//! Shared state handed to every handler.

use axum::http::HeaderMap;
use lodestone_fsops::DownloadGate;
use lodestone_telemetry::Metrics;

use crate::JobHandles;
use crate::http::constants::HEADER_DIAGNOSTICS_TOKEN;

pub(crate) struct ApiState {
    pub(crate) jobs: JobHandles,
    pub(crate) gate: DownloadGate,
    pub(crate) telemetry: Metrics,
    diagnostics_token: Option<String>,
}

impl ApiState {
    pub(crate) const fn new(
        jobs: JobHandles,
        gate: DownloadGate,
        telemetry: Metrics,
        diagnostics_token: Option<String>,
    ) -> Self {
        Self {
            jobs,
            gate,
            telemetry,
            diagnostics_token,
        }
    }

    /// Whether the request presented the operator diagnostics token.
    pub(crate) fn diagnostics_allowed(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.diagnostics_token.as_deref() else {
            return false;
        };
        headers
            .get(HEADER_DIAGNOSTICS_TOKEN)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|presented| presented == expected)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use lodestone_core::{
        EngineDiagnostics, JobId, JobInspector, JobResult, JobWorkflow, StatusRecord, Submitted,
    };

    use super::*;

    struct Inert;

    #[async_trait]
    impl JobWorkflow for Inert {
        async fn submit(&self, _magnet: &str) -> JobResult<Submitted> {
            Err(lodestone_core::JobError::EngineNotReady)
        }
        async fn pause(&self, id: &JobId) -> JobResult<()> {
            Err(lodestone_core::JobError::not_found(id))
        }
        async fn resume(&self, id: &JobId) -> JobResult<()> {
            Err(lodestone_core::JobError::not_found(id))
        }
        async fn remove(&self, id: &JobId) -> JobResult<()> {
            Err(lodestone_core::JobError::not_found(id))
        }
    }

    #[async_trait]
    impl JobInspector for Inert {
        async fn list(&self) -> Vec<StatusRecord> {
            Vec::new()
        }
        async fn diagnostics(&self) -> JobResult<EngineDiagnostics> {
            Err(lodestone_core::JobError::EngineNotReady)
        }
    }

    async fn state(token: Option<&str>) -> Result<ApiState, Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let gate = DownloadGate::open(root.path()).await?;
        let inert = Arc::new(Inert);
        Ok(ApiState::new(
            JobHandles::new(inert.clone(), inert),
            gate,
            Metrics::new()?,
            token.map(str::to_string),
        ))
    }

    #[tokio::test]
    async fn diagnostics_require_matching_token() -> Result<(), Box<dyn std::error::Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_DIAGNOSTICS_TOKEN, HeaderValue::from_static("sesame"));

        assert!(state(Some("sesame")).await?.diagnostics_allowed(&headers));
        assert!(!state(Some("other")).await?.diagnostics_allowed(&headers));
        assert!(!state(None).await?.diagnostics_allowed(&headers));
        assert!(!state(Some("sesame")).await?.diagnostics_allowed(&HeaderMap::new()));
        Ok(())
    }
}
