#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Lodestone application wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `orchestrator.rs` (submission
//! coordination and reconciliation against the registry).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application error type.
pub mod error;
/// Job orchestration on top of the engine owner.
pub mod orchestrator;

pub use bootstrap::{run_app, run_app_with};
pub use error::{AppError, AppResult};
pub use orchestrator::{JobOrchestrator, OrchestratorSettings};
