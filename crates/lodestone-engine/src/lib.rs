#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Engine owner, command mailbox, and status translation.
//!
//! Every call into an [`EngineSession`] happens on the single task spawned by
//! [`EngineClient::spawn`]. Other contexts talk to it through a bounded command
//! queue with one-shot replies, watch its readiness, and subscribe to the
//! alerts it drains.

mod client;
mod command;
pub mod error;
pub mod events;
pub mod readiness;
pub mod session;
pub mod status;
mod worker;

pub use client::{EngineClient, EngineOptions};
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EngineEventStream};
pub use readiness::Readiness;
pub use session::{
    AddParams, AddedTorrent, EngineSession, HandleReport, HandleSnapshot, SessionFactory,
    TorrentMetadata, loopback::LoopbackSession, loopback_factory,
};
pub use status::{RawStatus, StatusSnapshotter};
