//! Engine session seam.
//!
//! An [`EngineSession`] is the handle-based interface of the external torrent
//! engine. Sessions are not assumed to be thread-safe: the owner task holds
//! the only `&mut` reference and runs every call.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use lodestone_config::EngineSettings;
use lodestone_core::{EngineHandle, JobFile, JobId};

use crate::events::EngineEvent;
use crate::status::RawStatus;

pub mod loopback;

/// Builds the session inside the owner task. Failure is memoised as the
/// engine's terminal initialisation error.
pub type SessionFactory =
    Box<dyn FnOnce(&EngineSettings) -> Result<Box<dyn EngineSession>> + Send + 'static>;

/// Factory for the in-process [`loopback::LoopbackSession`].
#[must_use]
pub fn loopback_factory() -> SessionFactory {
    Box::new(|settings: &EngineSettings| -> Result<Box<dyn EngineSession>> {
        Ok(Box::new(loopback::LoopbackSession::new(settings)))
    })
}

/// Parameters for registering a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddParams {
    /// Magnet URI as submitted.
    pub magnet: String,
    /// Directory the payload is written to.
    pub save_path: PathBuf,
    /// Download pieces in order.
    pub sequential: bool,
}

/// Result of a successful add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedTorrent {
    /// Handle for subsequent calls.
    pub handle: EngineHandle,
    /// Canonical identity assigned by the engine.
    pub canonical_id: JobId,
}

/// Metadata available once the engine resolved the transfer's info dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentMetadata {
    /// Name from the info dictionary.
    pub name: String,
    /// Constituent files.
    pub files: Vec<JobFile>,
}

/// Raw readings for one handle, gathered on the owner task.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleSnapshot {
    /// Loosely typed status fields.
    pub status: RawStatus,
    /// Metadata, when resolved.
    pub metadata: Option<TorrentMetadata>,
}

/// Per-handle outcome of an inspection; a failed read carries its message.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleReport {
    /// Inspected handle.
    pub handle: EngineHandle,
    /// Readings or the read failure.
    pub outcome: Result<HandleSnapshot, String>,
}

/// Handle-based engine interface.
#[async_trait]
pub trait EngineSession: Send {
    /// Engine version string.
    fn version(&self) -> String;

    /// Register a transfer and return its handle and canonical identity.
    async fn add_torrent(&mut self, params: &AddParams) -> Result<AddedTorrent>;

    /// Pause a transfer.
    async fn pause(&mut self, handle: EngineHandle) -> Result<()>;

    /// Resume a transfer.
    async fn resume(&mut self, handle: EngineHandle) -> Result<()>;

    /// Remove a transfer, keeping downloaded data.
    async fn remove(&mut self, handle: EngineHandle) -> Result<()>;

    /// Read the current status fields of a transfer.
    async fn status_of(&mut self, handle: EngineHandle) -> Result<RawStatus>;

    /// Read resolved metadata, if any.
    async fn metadata_of(&mut self, handle: EngineHandle) -> Result<Option<TorrentMetadata>>;

    /// Drain every pending alert.
    async fn pop_alerts(&mut self) -> Result<Vec<EngineEvent>>;
}
