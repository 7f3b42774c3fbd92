#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Engine-agnostic job model, registry, and workflow interfaces.
//!
//! Layout: `model` (records and status DTOs), `submission` (magnet parsing and
//! provisional identities), `registry` (the concurrent record store),
//! `service` (traits implemented by the orchestrator), `error` (taxonomy).

pub mod error;
pub mod model;
pub mod registry;
pub mod service;
pub mod submission;

pub use error::{JobError, JobResult, RegistryError};
pub use model::{
    EngineHandle, EngineReadiness, JobCounts, JobFile, JobId, JobRecord, Lifecycle, StateLabel,
    StatusRecord, SubmissionId, Submitted,
};
pub use registry::{Admission, Registry};
pub use service::{EngineDiagnostics, InitFailure, JobInspector, JobWorkflow};
pub use submission::{Fingerprint, FingerprintEncoding, MagnetSubmission, UNKNOWN_DISPLAY_NAME};
