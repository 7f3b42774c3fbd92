//! Submission coordination and registry reconciliation.
//!
//! # Design
//! - `submit` waits for engine readiness, admits a provisional record, and
//!   returns before the engine add runs. The add completes on its own task.
//! - Every registry write from a background add is fenced by the record's
//!   `SubmissionId`. A fenced-out or merged add releases the engine claim it
//!   was granted; the owner keeps the transfer while any other claim on it is
//!   outstanding.
//! - Reads never touch the engine directly: handles are inspected through the
//!   owner and each record is translated independently.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lodestone_core::{
    Admission, EngineDiagnostics, EngineHandle, JobError, JobId, JobInspector, JobRecord,
    JobResult, JobWorkflow, Lifecycle, MagnetSubmission, Registry, RegistryError, StatusRecord,
    SubmissionId, Submitted,
};
use lodestone_engine::{
    AddParams, AddedTorrent, EngineClient, EngineError, EngineEvent, HandleReport, Readiness,
    StatusSnapshotter,
};
use lodestone_telemetry::{Metrics, ReconcileOutcome};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Knobs the orchestrator needs from the server configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Save path handed to every add.
    pub download_root: PathBuf,
    /// Request sequential piece order on every add.
    pub sequential_download: bool,
    /// Upper bound a submission waits for engine readiness.
    pub readiness_timeout: Duration,
}

/// Implements the job workflow and inspector on top of the engine owner.
#[derive(Clone)]
pub struct JobOrchestrator {
    engine: EngineClient,
    registry: Arc<Registry>,
    snapshotter: StatusSnapshotter,
    telemetry: Metrics,
    settings: OrchestratorSettings,
}

impl JobOrchestrator {
    /// Wire an orchestrator around an engine client and a shared registry.
    #[must_use]
    pub fn new(
        engine: EngineClient,
        registry: Arc<Registry>,
        telemetry: Metrics,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            engine,
            registry,
            snapshotter: StatusSnapshotter::new(),
            telemetry,
            settings,
        }
    }

    /// Registry shared with the background reconcilers.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Follow engine alerts and fold name updates into the registry.
    pub fn spawn_event_listener(&self) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let mut events = self.engine.subscribe();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    EngineEvent::MetadataResolved { handle, name } => {
                        match registry.rename_by_handle(handle, &name) {
                            Some(id) => info!(job_id = %id, job_name = %name, "metadata resolved"),
                            None => debug!(%handle, "metadata for untracked handle"),
                        }
                    }
                    EngineEvent::StateChanged { handle, state } => {
                        debug!(%handle, ?state, "engine state changed");
                    }
                    EngineEvent::Finished { handle } => info!(%handle, "download finished"),
                    EngineEvent::Failed { handle, message } => {
                        warn!(%handle, error = %message, "engine reported job failure");
                    }
                }
            }
            debug!("engine event stream closed");
        })
    }

    fn spawn_add(&self, magnet: String, provisional: JobId, submission: SubmissionId) {
        let this = self.clone();
        let params = AddParams {
            magnet,
            save_path: self.settings.download_root.clone(),
            sequential: self.settings.sequential_download,
        };
        tokio::spawn(async move {
            let outcome = this.complete_add(params, &provisional, submission).await;
            this.telemetry.inc_job_reconciled(outcome);
            this.refresh_gauges();
        });
    }

    /// Run the engine add for one submission and reconcile its result.
    async fn complete_add(
        &self,
        params: AddParams,
        provisional: &JobId,
        submission: SubmissionId,
    ) -> ReconcileOutcome {
        match self.engine.add(params).await {
            Ok(added) => self.adopt(added, provisional, submission).await,
            Err(err) => {
                let detail = failure_detail(&err);
                warn!(job_id = %provisional, error = %detail, "engine add failed");
                match self.registry.mark_errored(provisional, submission, detail) {
                    Ok(()) => ReconcileOutcome::Errored,
                    Err(_) => ReconcileOutcome::Abandoned,
                }
            }
        }
    }

    async fn adopt(
        &self,
        added: AddedTorrent,
        provisional: &JobId,
        submission: SubmissionId,
    ) -> ReconcileOutcome {
        let AddedTorrent {
            handle,
            canonical_id,
        } = added;
        let placeholder = self
            .registry
            .get(provisional)
            .filter(|record| record.submission == submission);
        let Some(placeholder) = placeholder else {
            return self.release_orphan(handle, provisional).await;
        };

        match self.registry.replace(
            provisional,
            submission,
            placeholder.activated(canonical_id.clone(), handle),
        ) {
            Ok(_) => {
                info!(
                    job_id = %canonical_id,
                    provisional_id = %provisional,
                    %handle,
                    "job registered with engine"
                );
                ReconcileOutcome::Active
            }
            Err(RegistryError::DuplicateIdentity { id }) => {
                self.registry.discard(provisional, submission);
                self.release_engine_job(handle, &id).await;
                info!(
                    job_id = %id,
                    provisional_id = %provisional,
                    "submission merged into existing job"
                );
                ReconcileOutcome::Merged
            }
            Err(RegistryError::NotFound { .. } | RegistryError::StaleSubmission { .. }) => {
                self.release_orphan(handle, provisional).await
            }
        }
    }

    /// The placeholder disappeared while the add was in flight.
    async fn release_orphan(&self, handle: EngineHandle, provisional: &JobId) -> ReconcileOutcome {
        info!(job_id = %provisional, %handle, "releasing engine job for withdrawn submission");
        self.release_engine_job(handle, provisional).await;
        ReconcileOutcome::Abandoned
    }

    async fn release_engine_job(&self, handle: EngineHandle, id: &JobId) {
        if let Err(err) = self.engine.release(handle).await {
            error!(job_id = %id, %handle, error = %err, "failed to release engine job");
        }
    }

    fn active_handle(&self, id: &JobId) -> JobResult<EngineHandle> {
        self.registry
            .get(id)
            .filter(|record| record.lifecycle == Lifecycle::Active)
            .and_then(|record| record.handle)
            .ok_or_else(|| JobError::not_found(id))
    }

    fn refresh_gauges(&self) {
        let counts = self.registry.counts();
        self.telemetry.set_job_counts(counts.total(), counts.adding);
    }

    fn status_for(
        &self,
        record: &JobRecord,
        reports: &HashMap<EngineHandle, HandleReport>,
        inspect_failure: Option<&str>,
    ) -> StatusRecord {
        let (Lifecycle::Active, Some(handle)) = (record.lifecycle, record.handle) else {
            return StatusRecord::from_record(record);
        };
        match reports.get(&handle) {
            Some(report) => self
                .snapshotter
                .snapshot(record, report.outcome.as_ref().map_err(String::as_str)),
            None => StatusRecord::degraded(
                record,
                inspect_failure.unwrap_or("engine did not report this handle"),
            ),
        }
    }
}

fn failure_detail(err: &EngineError) -> String {
    match err {
        EngineError::Session { detail, .. } => detail.clone(),
        EngineError::InitFailed { failure } => failure.summary.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl JobWorkflow for JobOrchestrator {
    async fn submit(&self, magnet: &str) -> JobResult<Submitted> {
        let submission = MagnetSubmission::parse(magnet)?;
        self.engine
            .wait_ready(self.settings.readiness_timeout)
            .await
            .map_err(JobError::from)?;

        let placeholder = JobRecord::adding(submission.provisional_id(), submission.display_name());
        match self.registry.admit(placeholder) {
            Admission::Existing(record) => {
                info!(job_id = %record.id, lifecycle = ?record.lifecycle, "submission already tracked");
                Ok(Submitted {
                    id: record.id,
                    name: record.display_name,
                })
            }
            Admission::Admitted(record) => {
                self.telemetry.inc_job_submitted();
                self.refresh_gauges();
                info!(job_id = %record.id, job_name = %record.display_name, "submission admitted");
                self.spawn_add(
                    submission.uri().to_string(),
                    record.id.clone(),
                    record.submission,
                );
                Ok(Submitted {
                    id: record.id,
                    name: record.display_name,
                })
            }
        }
    }

    async fn pause(&self, id: &JobId) -> JobResult<()> {
        let handle = self.active_handle(id)?;
        self.engine.pause(handle).await.map_err(JobError::from)
    }

    async fn resume(&self, id: &JobId) -> JobResult<()> {
        let handle = self.active_handle(id)?;
        self.engine.resume(handle).await.map_err(JobError::from)
    }

    async fn remove(&self, id: &JobId) -> JobResult<()> {
        let record = self.registry.remove(id)?;
        self.refresh_gauges();
        if let Some(handle) = record.handle {
            self.release_engine_job(handle, id).await;
        }
        Ok(())
    }
}

#[async_trait]
impl JobInspector for JobOrchestrator {
    async fn list(&self) -> Vec<StatusRecord> {
        let records = self.registry.snapshot();
        let handles: Vec<EngineHandle> = records
            .iter()
            .filter(|record| record.lifecycle == Lifecycle::Active)
            .filter_map(|record| record.handle)
            .collect();

        let (reports, inspect_failure) = match self.engine.inspect(handles).await {
            Ok(reports) => (
                reports
                    .into_iter()
                    .map(|report| (report.handle, report))
                    .collect::<HashMap<_, _>>(),
                None,
            ),
            Err(err) => {
                warn!(error = %err, "engine inspection failed; listing degraded");
                (HashMap::new(), Some(err.to_string()))
            }
        };

        records
            .iter()
            .map(|record| self.status_for(record, &reports, inspect_failure.as_deref()))
            .collect()
    }

    async fn diagnostics(&self) -> JobResult<EngineDiagnostics> {
        let readiness = self.engine.readiness();
        let (engine_version, init_failure) = match &readiness {
            Readiness::Ready { version } => (Some(version.clone()), None),
            Readiness::Failed { failure } => (None, Some(failure.clone())),
            Readiness::Starting => (None, None),
        };
        Ok(EngineDiagnostics {
            engine_version,
            readiness: readiness.coarse(),
            init_failure,
            counts: self.registry.counts(),
        })
    }
}
