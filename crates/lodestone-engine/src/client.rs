//! Cloneable front door to the engine owner task.

use std::time::Duration;

use lodestone_config::EngineSettings;
use lodestone_core::EngineHandle;
use lodestone_telemetry::Metrics;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;

use crate::command::EngineCommand;
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EngineEventStream};
use crate::readiness::Readiness;
use crate::session::{AddParams, AddedTorrent, HandleReport, SessionFactory};
use crate::worker::{self, WorkerContext};

const COMMAND_BUFFER: usize = 128;
const EVENT_BUFFER: usize = 256;

/// Runtime knobs for the engine owner.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Settings handed to the session factory.
    pub settings: EngineSettings,
    /// Interval between alert drains.
    pub alert_poll_interval: Duration,
    /// Upper bound for enqueueing a command and receiving its reply.
    pub command_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            settings: EngineSettings::default(),
            alert_poll_interval: Duration::from_millis(100),
            command_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for issuing commands to the engine owner.
#[derive(Clone)]
pub struct EngineClient {
    commands: mpsc::Sender<EngineCommand>,
    readiness: watch::Receiver<Readiness>,
    events: broadcast::Sender<EngineEvent>,
    command_timeout: Duration,
}

impl EngineClient {
    /// Spawn the owner task; the session is built inside it by `factory`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(factory: SessionFactory, options: EngineOptions, metrics: Option<Metrics>) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let (readiness_tx, readiness) = watch::channel(Readiness::Starting);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        worker::spawn(
            WorkerContext {
                factory,
                settings: options.settings,
                alert_poll_interval: options.alert_poll_interval,
                readiness: readiness_tx,
                events: events.clone(),
                metrics,
            },
            rx,
        );
        Self {
            commands,
            readiness,
            events,
            command_timeout: options.command_timeout,
        }
    }

    /// Current readiness without waiting.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    /// Wait up to `limit` for initialisation to settle; returns the engine version.
    ///
    /// # Errors
    ///
    /// - `InitFailed` when initialisation failed (immediately, on every call).
    /// - `NotReady` when `limit` elapses first.
    /// - `OwnerStopped` when the owner task is gone.
    pub async fn wait_ready(&self, limit: Duration) -> EngineResult<String> {
        let mut readiness = self.readiness.clone();
        let settled = timeout(limit, readiness.wait_for(Readiness::is_settled))
            .await
            .map_err(|_| EngineError::NotReady)?
            .map_err(|_| EngineError::OwnerStopped {
                operation: "wait_ready",
            })?
            .clone();
        match settled {
            Readiness::Ready { version } => Ok(version),
            Readiness::Failed { failure } => Err(EngineError::InitFailed { failure }),
            Readiness::Starting => Err(EngineError::NotReady),
        }
    }

    /// Register a transfer with the engine.
    ///
    /// # Errors
    ///
    /// Propagates initialisation failures, session rejections, and command timeouts.
    pub async fn add(&self, params: AddParams) -> EngineResult<AddedTorrent> {
        self.request("add", |respond_to| EngineCommand::Add { params, respond_to })
            .await
    }

    /// Pause the transfer behind `handle`.
    ///
    /// # Errors
    ///
    /// Propagates initialisation failures, session rejections, and command timeouts.
    pub async fn pause(&self, handle: EngineHandle) -> EngineResult<()> {
        self.request("pause", |respond_to| EngineCommand::Pause { handle, respond_to })
            .await
    }

    /// Resume the transfer behind `handle`.
    ///
    /// # Errors
    ///
    /// Propagates initialisation failures, session rejections, and command timeouts.
    pub async fn resume(&self, handle: EngineHandle) -> EngineResult<()> {
        self.request("resume", |respond_to| EngineCommand::Resume { handle, respond_to })
            .await
    }

    /// Give back the claim an [`EngineClient::add`] granted on `handle`.
    ///
    /// Adds of content the session already holds return the same handle and
    /// each grants its own claim. The transfer is removed from the session only
    /// when the last claim is released.
    ///
    /// # Errors
    ///
    /// Propagates initialisation failures, session rejections, and command timeouts.
    pub async fn release(&self, handle: EngineHandle) -> EngineResult<()> {
        self.request("release", |respond_to| EngineCommand::Release { handle, respond_to })
            .await
    }

    /// Read status and metadata for each handle on the owner task.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when the owner cannot answer; per-handle read
    /// failures are reported inside each [`HandleReport`].
    pub async fn inspect(&self, handles: Vec<EngineHandle>) -> EngineResult<Vec<HandleReport>> {
        if handles.is_empty() {
            return Ok(Vec::new());
        }
        self.request("inspect", |respond_to| EngineCommand::Inspect {
            handles,
            respond_to,
        })
        .await
    }

    /// Subscribe to alerts drained by the owner.
    #[must_use]
    pub fn subscribe(&self) -> EngineEventStream {
        EngineEventStream::new(self.events.subscribe())
    }

    async fn request<T, F>(&self, operation: &'static str, build: F) -> EngineResult<T>
    where
        F: FnOnce(oneshot::Sender<EngineResult<T>>) -> EngineCommand,
    {
        let (respond_to, reply) = oneshot::channel();
        let command = build(respond_to);
        let round_trip = async {
            self.commands
                .send(command)
                .await
                .map_err(|_| EngineError::OwnerStopped { operation })?;
            reply
                .await
                .map_err(|_| EngineError::OwnerStopped { operation })?
        };
        timeout(self.command_timeout, round_trip)
            .await
            .map_err(|_| EngineError::Busy { operation })?
    }
}
