//! # Design
//!
//! - Constant-message errors for the download boundary.
//! - Operation context (paths) lives in fields, never in the message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by the download gate.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The requested path resolves outside the download root.
    #[error("path escapes the download root")]
    Forbidden {
        /// Relative path as requested.
        requested: String,
    },
    /// The requested path does not exist inside the download root.
    #[error("requested file not found")]
    NotFound {
        /// Relative path as requested.
        requested: String,
    },
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
