//! Alerts drained from the engine session and rebroadcast to subscribers.

use std::pin::Pin;
use std::task::{Context, Poll};

use lodestone_core::{EngineHandle, StateLabel};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

/// Engine-originated events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Metadata for the transfer became available.
    MetadataResolved {
        /// Transfer handle.
        handle: EngineHandle,
        /// Name reported by the metadata.
        name: String,
    },
    /// The transfer moved to a new state.
    StateChanged {
        /// Transfer handle.
        handle: EngineHandle,
        /// New state.
        state: StateLabel,
    },
    /// The payload finished downloading.
    Finished {
        /// Transfer handle.
        handle: EngineHandle,
    },
    /// The engine reported an error for the transfer.
    Failed {
        /// Transfer handle.
        handle: EngineHandle,
        /// Engine-provided message.
        message: String,
    },
}

impl EngineEvent {
    /// Handle the event refers to.
    #[must_use]
    pub const fn handle(&self) -> EngineHandle {
        match self {
            Self::MetadataResolved { handle, .. }
            | Self::StateChanged { handle, .. }
            | Self::Finished { handle }
            | Self::Failed { handle, .. } => *handle,
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MetadataResolved { .. } => "metadata_resolved",
            Self::StateChanged { .. } => "state_changed",
            Self::Finished { .. } => "finished",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Stream of engine events that skips over lagged gaps.
pub struct EngineEventStream {
    inner: BroadcastStream<EngineEvent>,
}

impl EngineEventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<EngineEvent>) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
        }
    }
}

impl Stream for EngineEventStream {
    type Item = EngineEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    warn!(skipped, "engine event subscriber lagged");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
