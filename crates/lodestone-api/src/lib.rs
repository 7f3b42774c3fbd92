#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! HTTP surface for the Lodestone job control plane.
//!
//! Layout: `http` (router, handlers, problem responses, middleware),
//! `models` (request/response DTOs), `state` (shared handler state),
//! `error` (server bootstrap failures).

pub mod error;
mod http;
pub mod models;
mod state;

use std::sync::Arc;

use lodestone_core::{JobInspector, JobWorkflow};

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;

/// Workflow and inspector pair the handlers dispatch to.
#[derive(Clone)]
pub struct JobHandles {
    workflow: Arc<dyn JobWorkflow>,
    inspector: Arc<dyn JobInspector>,
}

impl JobHandles {
    /// Construct a handle pair from shared workflow and inspector implementations.
    #[must_use]
    pub fn new(workflow: Arc<dyn JobWorkflow>, inspector: Arc<dyn JobInspector>) -> Self {
        Self {
            workflow,
            inspector,
        }
    }

    /// Accessor for the workflow implementation.
    #[must_use]
    pub fn workflow(&self) -> &Arc<dyn JobWorkflow> {
        &self.workflow
    }

    /// Accessor for the inspector implementation.
    #[must_use]
    pub fn inspector(&self) -> &Arc<dyn JobInspector> {
        &self.inspector
    }
}
