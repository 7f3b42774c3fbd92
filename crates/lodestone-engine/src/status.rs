//! Translation of engine status readings into [`StatusRecord`].
//!
//! # Design
//! - Engines rename and retype status fields between versions. Each output
//!   field is resolved through a fixed-order table of probes; the first probe
//!   whose path is present and decodes wins.
//! - A missing field falls back to a neutral default. Only a failed read of the
//!   handle itself degrades the record.

use lodestone_core::{JobRecord, StateLabel, StatusRecord};
use serde_json::{Map, Value};

use crate::session::{HandleSnapshot, TorrentMetadata};

/// `torrent_flags::paused` bit in libtorrent-style flag words.
const PAUSED_FLAG: u64 = 1 << 4;

/// Loosely typed status fields as reported by an engine session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStatus {
    fields: Map<String, Value>,
}

impl RawStatus {
    /// Empty reading.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Look up a dotted path (`state.name`) through nested objects.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for RawStatus {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

struct Probe<T: 'static> {
    path: &'static str,
    decode: fn(&Value) -> Option<T>,
}

const fn probe<T: 'static>(path: &'static str, decode: fn(&Value) -> Option<T>) -> Probe<T> {
    Probe { path, decode }
}

const PROGRESS: &[Probe<f64>] = &[
    probe("progress", fraction_to_percent),
    probe("progress_ppm", ppm_to_percent),
];
const DOWNLOAD_RATE: &[Probe<u64>] = &[
    probe("download_rate", as_u64),
    probe("download_payload_rate", as_u64),
    probe("download_bps", as_u64),
];
const UPLOAD_RATE: &[Probe<u64>] = &[
    probe("upload_rate", as_u64),
    probe("upload_payload_rate", as_u64),
    probe("upload_bps", as_u64),
];
const PEERS: &[Probe<u32>] = &[probe("num_peers", as_u32), probe("peers", as_u32)];
const SEEDS: &[Probe<u32>] = &[
    probe("num_seeds", as_u32),
    probe("seeds", as_u32),
    probe("list_seeds", as_u32),
];
const TOTAL_DONE: &[Probe<u64>] = &[
    probe("total_done", as_u64),
    probe("total_wanted_done", as_u64),
];
const TOTAL_WANTED: &[Probe<u64>] = &[
    probe("total_wanted", as_u64),
    probe("total_size", as_u64),
];
const STATE: &[Probe<StateLabel>] = &[
    probe("state.name", state_from_name),
    probe("state_name", state_from_name),
    probe("state", state_from_any),
];
const PAUSED: &[Probe<bool>] = &[
    probe("flags", paused_from_flags),
    probe("paused", Value::as_bool),
    probe("is_paused", Value::as_bool),
];
// `Some(None)` means the engine positively reported "no error".
const ERROR: &[Probe<Option<String>>] = &[
    probe("errc", error_from_code),
    probe("error", error_from_text),
];

fn resolve<T: 'static>(status: &RawStatus, table: &[Probe<T>]) -> Option<T> {
    table
        .iter()
        .find_map(|probe| status.lookup(probe.path).and_then(probe.decode))
}

/// Maps engine readings onto the stable status shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusSnapshotter;

impl StatusSnapshotter {
    /// Construct the snapshotter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Produce the external status for `record` from the owner's reading.
    ///
    /// Never fails: a failed reading yields [`StatusRecord::degraded`].
    #[must_use]
    pub fn snapshot(
        &self,
        record: &JobRecord,
        reading: Result<&HandleSnapshot, &str>,
    ) -> StatusRecord {
        match reading {
            Ok(snapshot) => self.translate(record, &snapshot.status, snapshot.metadata.as_ref()),
            Err(error) => StatusRecord::degraded(record, error),
        }
    }

    /// Translate raw fields, using metadata when present.
    #[must_use]
    pub fn translate(
        &self,
        record: &JobRecord,
        status: &RawStatus,
        metadata: Option<&TorrentMetadata>,
    ) -> StatusRecord {
        let error = resolve(status, ERROR).flatten();
        let paused = resolve(status, PAUSED).unwrap_or(false);
        let state = if error.is_some() {
            StateLabel::Error
        } else if paused {
            StateLabel::Paused
        } else {
            resolve(status, STATE).unwrap_or(StateLabel::Unknown)
        };

        let (name, files) = metadata.map_or_else(
            || (record.display_name.clone(), Vec::new()),
            |meta| (meta.name.clone(), meta.files.clone()),
        );

        StatusRecord {
            id: record.id.clone(),
            name,
            progress: resolve(status, PROGRESS).unwrap_or(0.0),
            download_rate: resolve(status, DOWNLOAD_RATE).unwrap_or(0),
            upload_rate: resolve(status, UPLOAD_RATE).unwrap_or(0),
            num_peers: resolve(status, PEERS).unwrap_or(0),
            num_seeds: resolve(status, SEEDS).unwrap_or(0),
            state,
            total_done: resolve(status, TOTAL_DONE).unwrap_or(0),
            total_wanted: resolve(status, TOTAL_WANTED).unwrap_or(0),
            paused,
            error,
            files,
            lifecycle: record.lifecycle,
        }
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|number| number.is_finite() && *number >= 0.0)
            .map(|number| number.round() as u64)
    })
}

fn as_u32(value: &Value) -> Option<u32> {
    as_u64(value).map(|number| u32::try_from(number).unwrap_or(u32::MAX))
}

fn round_percent(percent: f64) -> f64 {
    (percent.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

fn fraction_to_percent(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .filter(|fraction| fraction.is_finite())
        .map(|fraction| round_percent(fraction * 100.0))
}

fn ppm_to_percent(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .filter(|ppm| ppm.is_finite())
        .map(|ppm| round_percent(ppm / 10_000.0))
}

fn state_from_name(value: &Value) -> Option<StateLabel> {
    value.as_str().map(label_for_name)
}

fn state_from_any(value: &Value) -> Option<StateLabel> {
    match value {
        Value::String(name) => Some(label_for_name(name)),
        Value::Number(code) => code.as_u64().map(label_for_code),
        Value::Object(object) => object.get("name").and_then(state_from_name),
        _ => None,
    }
}

fn label_for_name(raw: &str) -> StateLabel {
    let name = raw.rsplit('.').next().unwrap_or(raw).trim().to_ascii_lowercase();
    match name.as_str() {
        "queued" | "queued_for_checking" => StateLabel::Queued,
        "checking" | "checking_files" | "checking_resume_data" | "allocating" => {
            StateLabel::Checking
        }
        "downloading" | "downloading_metadata" => StateLabel::Downloading,
        "seeding" | "finished" => StateLabel::Seeding,
        "paused" | "stopped" => StateLabel::Paused,
        "error" => StateLabel::Error,
        _ => StateLabel::Unknown,
    }
}

/// libtorrent `torrent_status::state_t` codes.
const fn label_for_code(code: u64) -> StateLabel {
    match code {
        0 => StateLabel::Queued,
        1 | 6 | 7 => StateLabel::Checking,
        2 | 3 => StateLabel::Downloading,
        4 | 5 => StateLabel::Seeding,
        _ => StateLabel::Unknown,
    }
}

fn paused_from_flags(value: &Value) -> Option<bool> {
    value.as_u64().map(|flags| flags & PAUSED_FLAG != 0)
}

fn error_from_code(value: &Value) -> Option<Option<String>> {
    let object = value.as_object()?;
    let code = object.get("value")?.as_i64()?;
    if code == 0 {
        return Some(None);
    }
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map_or_else(|| format!("engine error {code}"), str::to_string);
    Some(Some(message))
}

fn error_from_text(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(text) if text.trim().is_empty() => Some(None),
        Value::String(text) => Some(Some(text.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestone_core::{EngineHandle, JobFile, JobId, Lifecycle};
    use serde_json::json;

    fn active_record() -> JobRecord {
        JobRecord::adding(JobId::from("abc"), "LinuxISO")
            .activated(JobId::from("abc"), EngineHandle::new(1))
    }

    #[test]
    fn current_field_names_translate() {
        let status = RawStatus::new()
            .with("progress", 0.423_56)
            .with("download_rate", 1_000)
            .with("upload_rate", 50)
            .with("num_peers", 12)
            .with("num_seeds", 4)
            .with("state", json!({"name": "downloading"}))
            .with("total_done", 4_235)
            .with("total_wanted", 10_000)
            .with("flags", 0)
            .with("errc", json!({"value": 0, "message": "Success"}));
        let record = StatusSnapshotter::new().translate(&active_record(), &status, None);
        assert!((record.progress - 42.4).abs() < f64::EPSILON);
        assert_eq!(record.download_rate, 1_000);
        assert_eq!(record.upload_rate, 50);
        assert_eq!(record.num_peers, 12);
        assert_eq!(record.num_seeds, 4);
        assert_eq!(record.state, StateLabel::Downloading);
        assert_eq!(record.total_done, 4_235);
        assert!(!record.paused);
        assert_eq!(record.error, None);
        assert_eq!(record.name, "LinuxISO");
        assert!(record.files.is_empty());
        assert_eq!(record.lifecycle, Lifecycle::Active);
    }

    #[test]
    fn legacy_field_names_translate() {
        let status = RawStatus::new()
            .with("progress_ppm", 1_000_000)
            .with("download_payload_rate", 7)
            .with("upload_bps", 3)
            .with("peers", 2)
            .with("list_seeds", 1)
            .with("state", "torrent_status.states.seeding")
            .with("total_wanted_done", 10)
            .with("total_size", 10)
            .with("paused", false);
        let record = StatusSnapshotter::new().translate(&active_record(), &status, None);
        assert!((record.progress - 100.0).abs() < f64::EPSILON);
        assert_eq!(record.download_rate, 7);
        assert_eq!(record.upload_rate, 3);
        assert_eq!(record.num_peers, 2);
        assert_eq!(record.num_seeds, 1);
        assert_eq!(record.state, StateLabel::Seeding);
        assert_eq!(record.total_done, 10);
        assert_eq!(record.total_wanted, 10);
    }

    #[test]
    fn numeric_state_codes_and_unknowns() {
        let snapshotter = StatusSnapshotter::new();
        let record = active_record();
        let checking = RawStatus::new().with("state", 1);
        assert_eq!(
            snapshotter.translate(&record, &checking, None).state,
            StateLabel::Checking
        );
        let odd = RawStatus::new().with("state_name", "teleporting");
        assert_eq!(
            snapshotter.translate(&record, &odd, None).state,
            StateLabel::Unknown
        );
        let empty = RawStatus::new();
        let translated = snapshotter.translate(&record, &empty, None);
        assert_eq!(translated.state, StateLabel::Unknown);
        assert!((translated.progress - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn error_and_pause_take_precedence() {
        let snapshotter = StatusSnapshotter::new();
        let record = active_record();
        let paused = RawStatus::new().with("state", "downloading").with("flags", 16 | 32);
        let translated = snapshotter.translate(&record, &paused, None);
        assert!(translated.paused);
        assert_eq!(translated.state, StateLabel::Paused);

        let errored = RawStatus::new()
            .with("state", "downloading")
            .with("flags", 16)
            .with("errc", json!({"value": 28, "message": "No space left on device"}));
        let translated = snapshotter.translate(&record, &errored, None);
        assert_eq!(translated.state, StateLabel::Error);
        assert_eq!(translated.error.as_deref(), Some("No space left on device"));

        let legacy_error = RawStatus::new().with("error", "tracker unreachable");
        assert_eq!(
            snapshotter.translate(&record, &legacy_error, None).error.as_deref(),
            Some("tracker unreachable")
        );
    }

    #[test]
    fn metadata_supplies_name_and_files() {
        let metadata = TorrentMetadata {
            name: "ubuntu-24.04.iso".to_string(),
            files: vec![JobFile {
                path: "ubuntu-24.04.iso".to_string(),
                size: 6_000_000_000,
            }],
        };
        let snapshot = HandleSnapshot {
            status: RawStatus::new().with("progress", 0.5),
            metadata: Some(metadata),
        };
        let record = StatusSnapshotter::new().snapshot(&active_record(), Ok(&snapshot));
        assert_eq!(record.name, "ubuntu-24.04.iso");
        assert_eq!(record.files.len(), 1);
        assert!((record.progress - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failed_reading_degrades() {
        let record = StatusSnapshotter::new().snapshot(&active_record(), Err("invalid torrent handle"));
        assert_eq!(record.name, "LinuxISO");
        assert_eq!(record.state, StateLabel::Error);
        assert_eq!(record.error.as_deref(), Some("invalid torrent handle"));
    }
}
