//! Engine owner task.
//!
//! The only context that touches the session. Commands arrive on the mailbox,
//! alerts are drained between commands and on a fixed poll. Each successful
//! add grants one claim on the returned handle; a transfer leaves the session
//! when its last claim is released.

#![allow(clippy::redundant_pub_crate)]

use std::collections::HashMap;
use std::time::Duration;

use lodestone_config::EngineSettings;
use lodestone_core::{EngineHandle, InitFailure};
use lodestone_telemetry::Metrics;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::command::EngineCommand;
use crate::error::{EngineError, EngineResult};
use crate::events::EngineEvent;
use crate::readiness::Readiness;
use crate::session::{
    AddParams, AddedTorrent, EngineSession, HandleReport, HandleSnapshot, SessionFactory,
};

pub(crate) struct WorkerContext {
    pub(crate) factory: SessionFactory,
    pub(crate) settings: EngineSettings,
    pub(crate) alert_poll_interval: Duration,
    pub(crate) readiness: watch::Sender<Readiness>,
    pub(crate) events: broadcast::Sender<EngineEvent>,
    pub(crate) metrics: Option<Metrics>,
}

pub(crate) fn spawn(context: WorkerContext, mut commands: mpsc::Receiver<EngineCommand>) {
    tokio::spawn(async move {
        let WorkerContext {
            factory,
            settings,
            alert_poll_interval,
            readiness,
            events,
            metrics,
        } = context;

        let session = match factory(&settings) {
            Ok(session) => session,
            Err(err) => {
                let failure = EngineError::init_failure(&err);
                error!(error = %failure.detail, "engine initialisation failed");
                readiness.send_replace(Readiness::Failed {
                    failure: failure.clone(),
                });
                reject_all(&mut commands, &failure).await;
                return;
            }
        };

        let version = session.version();
        info!(version = %version, "engine session ready");
        readiness.send_replace(Readiness::Ready { version });

        let mut worker = Worker {
            session,
            events,
            metrics,
            degraded: false,
            claims: HashMap::new(),
        };
        let mut poll = tokio::time::interval(alert_poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => worker.handle(command).await,
                        None => break,
                    }
                }
                _ = poll.tick() => worker.flush_alerts().await,
            }
        }
        worker.flush_alerts().await;
        debug!("engine owner stopped");
    });
}

/// Answer every command with the memoised initialisation failure.
async fn reject_all(commands: &mut mpsc::Receiver<EngineCommand>, failure: &InitFailure) {
    while let Some(command) = commands.recv().await {
        let err = EngineError::InitFailed {
            failure: failure.clone(),
        };
        match command {
            EngineCommand::Add { respond_to, .. } => {
                let _ = respond_to.send(Err(err));
            }
            EngineCommand::Pause { respond_to, .. }
            | EngineCommand::Resume { respond_to, .. }
            | EngineCommand::Release { respond_to, .. } => {
                let _ = respond_to.send(Err(err));
            }
            EngineCommand::Inspect { respond_to, .. } => {
                let _ = respond_to.send(Err(err));
            }
        }
    }
}

struct Worker {
    session: Box<dyn EngineSession>,
    events: broadcast::Sender<EngineEvent>,
    metrics: Option<Metrics>,
    degraded: bool,
    claims: HashMap<EngineHandle, usize>,
}

impl Worker {
    async fn handle(&mut self, command: EngineCommand) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_engine_command(command.name());
        }
        match command {
            EngineCommand::Add { params, respond_to } => {
                let result = self.handle_add(&params).await;
                if let Ok(added) = &result {
                    *self.claims.entry(added.handle).or_insert(0) += 1;
                }
                if let Err(Ok(added)) = respond_to.send(result) {
                    self.rollback_unclaimed(added).await;
                }
            }
            EngineCommand::Pause { handle, respond_to } => {
                let result = self
                    .session
                    .pause(handle)
                    .await
                    .map_err(|err| EngineError::session("pause", &err));
                debug!(%handle, ok = result.is_ok(), "pause command processed");
                let _ = respond_to.send(result);
            }
            EngineCommand::Resume { handle, respond_to } => {
                let result = self
                    .session
                    .resume(handle)
                    .await
                    .map_err(|err| EngineError::session("resume", &err));
                debug!(%handle, ok = result.is_ok(), "resume command processed");
                let _ = respond_to.send(result);
            }
            EngineCommand::Release { handle, respond_to } => {
                let result = self.release(handle).await;
                let _ = respond_to.send(result);
            }
            EngineCommand::Inspect {
                handles,
                respond_to,
            } => {
                let reports = self.inspect(handles).await;
                let _ = respond_to.send(Ok(reports));
            }
        }
        self.flush_alerts().await;
    }

    async fn handle_add(&mut self, params: &AddParams) -> EngineResult<AddedTorrent> {
        match self.session.add_torrent(params).await {
            Ok(added) => {
                info!(
                    handle = %added.handle,
                    canonical_id = %added.canonical_id,
                    sequential = params.sequential,
                    "add command processed"
                );
                Ok(added)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "engine rejected add");
                Err(EngineError::session("add", &err))
            }
        }
    }

    /// The requester stopped waiting before the add finished, so its claim
    /// is dropped on its behalf.
    async fn rollback_unclaimed(&mut self, added: AddedTorrent) {
        warn!(
            handle = %added.handle,
            canonical_id = %added.canonical_id,
            "add reply unclaimed; releasing transfer"
        );
        if let Err(err) = self.release(added.handle).await {
            warn!(error = %err, "failed to remove unclaimed transfer");
        }
    }

    /// Drop one claim on `handle` and remove the transfer once none remain.
    /// Handles this owner never granted are passed straight to the session.
    async fn release(&mut self, handle: EngineHandle) -> EngineResult<()> {
        if let Some(count) = self.claims.get_mut(&handle) {
            *count = count.saturating_sub(1);
            if *count > 0 {
                info!(%handle, remaining = *count, "transfer still claimed; kept in session");
                return Ok(());
            }
            self.claims.remove(&handle);
        }
        let result = self
            .session
            .remove(handle)
            .await
            .map_err(|err| EngineError::session("remove", &err));
        info!(%handle, ok = result.is_ok(), "remove command processed");
        result
    }

    async fn inspect(&mut self, handles: Vec<EngineHandle>) -> Vec<HandleReport> {
        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = self.read_handle(handle).await;
            if let Err(error) = &outcome {
                debug!(%handle, error = %error, "status read failed");
            }
            reports.push(HandleReport { handle, outcome });
        }
        reports
    }

    async fn read_handle(&mut self, handle: EngineHandle) -> Result<HandleSnapshot, String> {
        let status = self
            .session
            .status_of(handle)
            .await
            .map_err(|err| format!("{err:#}"))?;
        let metadata = self
            .session
            .metadata_of(handle)
            .await
            .map_err(|err| format!("{err:#}"))?;
        Ok(HandleSnapshot { status, metadata })
    }

    async fn flush_alerts(&mut self) {
        match self.session.pop_alerts().await {
            Ok(alerts) => {
                for alert in alerts {
                    debug!(kind = alert.kind(), handle = %alert.handle(), "engine alert");
                    let _ = self.events.send(alert);
                }
                self.mark_recovered();
            }
            Err(err) => self.mark_degraded(&format!("{err:#}")),
        }
    }

    fn mark_degraded(&mut self, detail: &str) {
        if self.degraded {
            debug!(detail = %detail, "engine alert polling still degraded");
        } else {
            self.degraded = true;
            warn!(detail = %detail, "engine alert polling degraded");
        }
    }

    fn mark_recovered(&mut self) {
        if self.degraded {
            self.degraded = false;
            info!("engine alert polling recovered");
        }
    }
}
