//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges the job control plane reports.

use std::sync::Arc;

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// How a background add was folded back into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The provisional record became an active canonical record.
    Active,
    /// The engine rejected the add and the record was marked errored.
    Errored,
    /// The provisional record was removed before the add finished.
    Abandoned,
    /// Another record already held the canonical identity.
    Merged,
}

impl ReconcileOutcome {
    /// Label value used on the `jobs_reconciled_total` counter.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Errored => "errored",
            Self::Abandoned => "abandoned",
            Self::Merged => "merged",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    jobs_submitted_total: IntCounter,
    jobs_reconciled_total: IntCounterVec,
    engine_commands_total: IntCounterVec,
    jobs_tracked: IntGauge,
    jobs_adding: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total submissions accepted by the add path.
    pub jobs_submitted_total: u64,
    /// Number of records currently held by the registry.
    pub jobs_tracked: i64,
    /// Number of records still waiting on the engine.
    pub jobs_adding: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = register(
            &registry,
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            ),
        )?;
        let jobs_submitted_total = register(
            &registry,
            "jobs_submitted_total",
            IntCounter::with_opts(Opts::new(
                "jobs_submitted_total",
                "Job submissions accepted by the add path",
            )),
        )?;
        let jobs_reconciled_total = register(
            &registry,
            "jobs_reconciled_total",
            IntCounterVec::new(
                Opts::new(
                    "jobs_reconciled_total",
                    "Background adds folded back into the registry by outcome",
                ),
                &["outcome"],
            ),
        )?;
        let engine_commands_total = register(
            &registry,
            "engine_commands_total",
            IntCounterVec::new(
                Opts::new(
                    "engine_commands_total",
                    "Commands processed by the engine owner",
                ),
                &["command"],
            ),
        )?;
        let jobs_tracked = register(
            &registry,
            "jobs_tracked",
            IntGauge::with_opts(Opts::new("jobs_tracked", "Records held by the registry")),
        )?;
        let jobs_adding = register(
            &registry,
            "jobs_adding",
            IntGauge::with_opts(Opts::new(
                "jobs_adding",
                "Records waiting on a background add",
            )),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                jobs_submitted_total,
                jobs_reconciled_total,
                engine_commands_total,
                jobs_tracked,
                jobs_adding,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Count an accepted job submission.
    pub fn inc_job_submitted(&self) {
        self.inner.jobs_submitted_total.inc();
    }

    /// Count the outcome of a background add.
    pub fn inc_job_reconciled(&self, outcome: ReconcileOutcome) {
        self.inner
            .jobs_reconciled_total
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    /// Count a command processed by the engine owner.
    pub fn inc_engine_command(&self, command: &str) {
        self.inner
            .engine_commands_total
            .with_label_values(&[command])
            .inc();
    }

    /// Publish the registry population gauges.
    pub fn set_job_counts(&self, tracked: usize, adding: usize) {
        self.inner.jobs_tracked.set(saturating_i64(tracked));
        self.inner.jobs_adding.set(saturating_i64(adding));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_submitted_total: self.inner.jobs_submitted_total.get(),
            jobs_tracked: self.inner.jobs_tracked.get(),
            jobs_adding: self.inner.jobs_adding.get(),
        }
    }
}

fn register<C>(
    registry: &Registry,
    name: &'static str,
    collector: prometheus::Result<C>,
) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    let collector = collector.map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}

fn saturating_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
