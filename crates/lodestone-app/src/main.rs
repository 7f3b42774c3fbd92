#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]

//! Binary entrypoint that wires the Lodestone services together.

use lodestone_app::{AppResult, run_app};

/// Bootstraps the application and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
