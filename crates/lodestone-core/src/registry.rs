//! Concurrency-safe store of job records.
//!
//! # Design
//! - One `RwLock<HashMap>` guards every record; each operation holds the lock
//!   only for the map mutation itself.
//! - `replace` performs both halves of the provisional-to-canonical move under a
//!   single write lock, so readers never observe the job missing.
//! - Completion writes are fenced by [`SubmissionId`]: a background add that
//!   finishes after its placeholder was removed (or resubmitted) cannot resurrect
//!   or overwrite it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::RegistryError;
use crate::model::{EngineHandle, JobCounts, JobId, JobRecord, Lifecycle, SubmissionId};

/// Result of attempting to admit a new submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The placeholder was stored; the caller owns the background add.
    Admitted(JobRecord),
    /// A live record already holds the identity; no new work should start.
    Existing(JobRecord),
}

/// In-memory registry of job records keyed by identity.
#[derive(Debug, Default)]
pub struct Registry {
    records: RwLock<HashMap<JobId, JobRecord>>,
}

impl Registry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new record under its identity.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateIdentity` if the identity is already present.
    pub fn insert(&self, record: JobRecord) -> Result<(), RegistryError> {
        let mut records = self.write();
        if records.contains_key(&record.id) {
            return Err(RegistryError::DuplicateIdentity { id: record.id });
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Admit a placeholder unless a live record already holds its identity.
    ///
    /// `Adding` and `Active` records are returned as [`Admission::Existing`];
    /// an `Errored` record is superseded by the new attempt.
    pub fn admit(&self, record: JobRecord) -> Admission {
        let mut records = self.write();
        if let Some(existing) = records.get(&record.id) {
            if matches!(existing.lifecycle, Lifecycle::Adding | Lifecycle::Active) {
                return Admission::Existing(existing.clone());
            }
        }
        records.insert(record.id.clone(), record.clone());
        Admission::Admitted(record)
    }

    /// Move the placeholder stored under `old_id` to `record.id` in one step.
    ///
    /// The placeholder must still belong to `submission`. Returns the placeholder
    /// that was replaced.
    ///
    /// # Errors
    ///
    /// - `NotFound` when `old_id` is no longer present (removed meanwhile).
    /// - `StaleSubmission` when `old_id` now belongs to another attempt.
    /// - `DuplicateIdentity` when a different record already holds `record.id`;
    ///   the placeholder is left untouched.
    pub fn replace(
        &self,
        old_id: &JobId,
        submission: SubmissionId,
        record: JobRecord,
    ) -> Result<JobRecord, RegistryError> {
        let mut records = self.write();
        Self::check_submission(&records, old_id, submission)?;
        if record.id != *old_id && records.contains_key(&record.id) {
            return Err(RegistryError::DuplicateIdentity { id: record.id });
        }
        let previous = records
            .remove(old_id)
            .ok_or_else(|| RegistryError::NotFound { id: old_id.clone() })?;
        records.insert(record.id.clone(), record);
        Ok(previous)
    }

    /// Mark the placeholder for `submission` as errored in place.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `StaleSubmission` under the same rules as [`Registry::replace`].
    pub fn mark_errored(
        &self,
        id: &JobId,
        submission: SubmissionId,
        detail: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let mut records = self.write();
        Self::check_submission(&records, id, submission)?;
        if let Some(record) = records.get_mut(id) {
            record.lifecycle = Lifecycle::Errored;
            record.handle = None;
            record.error_detail = Some(detail.into());
        }
        Ok(())
    }

    /// Drop the placeholder for `submission` if it is still present.
    pub fn discard(&self, id: &JobId, submission: SubmissionId) -> Option<JobRecord> {
        let mut records = self.write();
        Self::check_submission(&records, id, submission).ok()?;
        records.remove(id)
    }

    /// Delete a record, returning it marked as `Removed`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` when the identity is unknown.
    pub fn remove(&self, id: &JobId) -> Result<JobRecord, RegistryError> {
        let mut record = self
            .write()
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;
        record.lifecycle = Lifecycle::Removed;
        Ok(record)
    }

    /// Clone the record stored under `id`.
    #[must_use]
    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.read().get(id).cloned()
    }

    /// Refresh the display name of the active record bound to `handle`.
    ///
    /// Returns the identity of the updated record, if any.
    pub fn rename_by_handle(&self, handle: EngineHandle, name: &str) -> Option<JobId> {
        let mut records = self.write();
        let record = records
            .values_mut()
            .find(|record| record.handle == Some(handle))?;
        record.display_name = name.to_string();
        Some(record.id.clone())
    }

    /// Point-in-time copy of every record, oldest submission first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.read().values().cloned().collect();
        records.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    /// Population by lifecycle.
    #[must_use]
    pub fn counts(&self) -> JobCounts {
        self.read()
            .values()
            .fold(JobCounts::default(), |mut counts, record| {
                match record.lifecycle {
                    Lifecycle::Adding => counts.adding += 1,
                    Lifecycle::Active => counts.active += 1,
                    Lifecycle::Errored => counts.errored += 1,
                    Lifecycle::Removed => {}
                }
                counts
            })
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn check_submission(
        records: &HashMap<JobId, JobRecord>,
        id: &JobId,
        submission: SubmissionId,
    ) -> Result<(), RegistryError> {
        match records.get(id) {
            None => Err(RegistryError::NotFound { id: id.clone() }),
            Some(record)
                if record.submission != submission || record.lifecycle != Lifecycle::Adding =>
            {
                Err(RegistryError::StaleSubmission { id: id.clone() })
            }
            Some(_) => Ok(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, JobRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, JobRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}
