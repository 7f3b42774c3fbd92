#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Filesystem boundary for serving completed downloads.

pub mod error;
pub mod gate;

pub use error::{FsOpsError, FsOpsResult};
pub use gate::DownloadGate;
