//! Mailbox protocol between [`crate::EngineClient`] and the owner task.

use lodestone_core::EngineHandle;
use tokio::sync::oneshot;

use crate::error::EngineResult;
use crate::session::{AddParams, AddedTorrent, HandleReport};

/// Requests accepted by the engine owner; each carries its reply channel.
#[derive(Debug)]
pub(crate) enum EngineCommand {
    /// Register a new transfer with the session.
    Add {
        params: AddParams,
        respond_to: oneshot::Sender<EngineResult<AddedTorrent>>,
    },
    /// Pause a transfer without removing it.
    Pause {
        handle: EngineHandle,
        respond_to: oneshot::Sender<EngineResult<()>>,
    },
    /// Resume a paused transfer.
    Resume {
        handle: EngineHandle,
        respond_to: oneshot::Sender<EngineResult<()>>,
    },
    /// Drop one claim on a transfer; the last release removes it from the
    /// session. Downloaded data stays on disk.
    Release {
        handle: EngineHandle,
        respond_to: oneshot::Sender<EngineResult<()>>,
    },
    /// Read status and metadata for a batch of handles.
    Inspect {
        handles: Vec<EngineHandle>,
        respond_to: oneshot::Sender<EngineResult<Vec<HandleReport>>>,
    },
}

impl EngineCommand {
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Pause { .. } => "pause",
            Self::Resume { .. } => "resume",
            Self::Release { .. } => "release",
            Self::Inspect { .. } => "inspect",
        }
    }
}
