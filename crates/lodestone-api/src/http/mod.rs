//! HTTP router, handlers, and middleware.

pub(crate) mod constants;
pub(crate) mod debug;
pub(crate) mod download;
pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod jobs;
pub(crate) mod router;
pub(crate) mod telemetry;
