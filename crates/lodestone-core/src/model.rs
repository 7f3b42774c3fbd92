//! Job records, identities, and the externally visible status shape.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a job, either provisional (derived from the submission) or
/// canonical (assigned by the engine). The two forms may differ in text for the
/// same content, so they must never be compared to decide content equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap an identity string as-is.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identity text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identity, returning the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token distinguishing one submission attempt from another for the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionId(u64);

static NEXT_SUBMISSION: AtomicU64 = AtomicU64::new(1);

impl SubmissionId {
    /// Allocate a process-unique submission token.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBMISSION.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw token value, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Opaque reference to one engine-managed transfer. Only meaningful to the
/// engine owner that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineHandle(u64);

impl EngineHandle {
    /// Wrap an engine-issued handle value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Externally visible lifecycle of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Inserted on submission; the engine add has not completed.
    Adding,
    /// Registered with the engine under its canonical identity.
    Active,
    /// The engine add failed; `error_detail` explains why.
    Errored,
    /// Deleted from the registry; only seen on records returned by removal.
    Removed,
}

/// Bookkeeping record owned by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Current identity (provisional while `Adding`/`Errored`, canonical once `Active`).
    pub id: JobId,
    /// Human-readable name; refreshed when engine metadata resolves.
    pub display_name: String,
    /// Engine handle, present only while `Active`.
    pub handle: Option<EngineHandle>,
    /// Lifecycle stage.
    pub lifecycle: Lifecycle,
    /// Failure description, present only while `Errored`.
    pub error_detail: Option<String>,
    /// Submission attempt that produced this record.
    pub submission: SubmissionId,
    /// When the submission was accepted.
    pub submitted_at: DateTime<Utc>,
}

impl JobRecord {
    /// Fresh placeholder for a submission that has not reached the engine yet.
    #[must_use]
    pub fn adding(id: JobId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            handle: None,
            lifecycle: Lifecycle::Adding,
            error_detail: None,
            submission: SubmissionId::next(),
            submitted_at: Utc::now(),
        }
    }

    /// Canonical successor of this placeholder once the engine accepted it.
    #[must_use]
    pub fn activated(&self, canonical: JobId, handle: EngineHandle) -> Self {
        Self {
            id: canonical,
            display_name: self.display_name.clone(),
            handle: Some(handle),
            lifecycle: Lifecycle::Active,
            error_detail: None,
            submission: self.submission,
            submitted_at: self.submitted_at,
        }
    }
}

/// Returned to the submitter before the engine add completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitted {
    /// Provisional identity.
    pub id: JobId,
    /// Display name extracted from the submission.
    pub name: String,
}

/// Normalised state vocabulary exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateLabel {
    /// Waiting on the background engine add.
    Adding,
    /// Queued by the engine.
    Queued,
    /// Verifying data or fetching metadata.
    Checking,
    /// Transferring payload.
    Downloading,
    /// Complete and uploading.
    Seeding,
    /// Paused by the user or engine.
    Paused,
    /// The job reports an error.
    Error,
    /// The engine reported something outside the vocabulary.
    Unknown,
}

/// One file inside a job once metadata is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFile {
    /// Path relative to the download root.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// Stable status shape returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Job identity.
    pub id: JobId,
    /// Display name.
    pub name: String,
    /// Completion percentage (0-100, one decimal place).
    pub progress: f64,
    /// Download rate in bytes per second.
    pub download_rate: u64,
    /// Upload rate in bytes per second.
    pub upload_rate: u64,
    /// Connected peers.
    pub num_peers: u32,
    /// Connected seeds.
    pub num_seeds: u32,
    /// Normalised state label.
    pub state: StateLabel,
    /// Bytes downloaded and verified.
    pub total_done: u64,
    /// Bytes selected for download.
    pub total_wanted: u64,
    /// Whether the job is paused.
    pub paused: bool,
    /// Human-readable error, if any.
    pub error: Option<String>,
    /// Constituent files; empty until metadata resolves.
    pub files: Vec<JobFile>,
    /// Registry lifecycle of the record.
    pub lifecycle: Lifecycle,
}

impl StatusRecord {
    /// Status for a record that has no engine handle to read from.
    #[must_use]
    pub fn from_record(record: &JobRecord) -> Self {
        let (state, error) = match record.lifecycle {
            Lifecycle::Errored => (StateLabel::Error, record.error_detail.clone()),
            Lifecycle::Adding => (StateLabel::Adding, None),
            Lifecycle::Active | Lifecycle::Removed => (StateLabel::Unknown, None),
        };
        Self {
            id: record.id.clone(),
            name: record.display_name.clone(),
            progress: 0.0,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            num_seeds: 0,
            state,
            total_done: 0,
            total_wanted: 0,
            paused: false,
            error,
            files: Vec::new(),
            lifecycle: record.lifecycle,
        }
    }

    /// Degraded status carrying only identity, last-known name, and the read error.
    #[must_use]
    pub fn degraded(record: &JobRecord, error: impl Into<String>) -> Self {
        Self {
            state: StateLabel::Error,
            error: Some(error.into()),
            ..Self::from_record(record)
        }
    }
}

/// Registry population by lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    /// Records waiting on the engine.
    pub adding: usize,
    /// Records registered with the engine.
    pub active: usize,
    /// Records whose add failed.
    pub errored: usize,
}

impl JobCounts {
    /// Total number of tracked records.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.adding + self.active + self.errored
    }
}

/// Coarse engine readiness as reported to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineReadiness {
    /// Initialisation still in progress.
    Starting,
    /// Engine accepted its settings and is processing commands.
    Ready,
    /// Initialisation failed; the failure is memoised.
    Failed,
}
