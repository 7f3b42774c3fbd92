//! In-process engine session.
//!
//! Simulates transfers without touching the network: metadata resolves on the
//! first alert drain after an add, then progress advances on every drain until
//! the payload completes. Status is reported with the field names of older
//! engine releases.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use lodestone_config::EngineSettings;
use lodestone_core::{EngineHandle, JobError, JobFile, JobId, MagnetSubmission, StateLabel};
use serde_json::json;
use tracing::{debug, info};

use super::{AddParams, AddedTorrent, EngineSession, TorrentMetadata};
use crate::events::EngineEvent;
use crate::status::RawStatus;

const SIMULATED_SIZE: u64 = 64 * 1024 * 1024;
const PPM_COMPLETE: u64 = 1_000_000;
const PROGRESS_STEP_PPM: u64 = 10_000;
const SIMULATED_RATE: u64 = 655_360;
const PAUSED_FLAG: u64 = 1 << 4;
const SEQUENTIAL_FLAG: u64 = 1 << 9;

/// Engine session that lives entirely in memory.
pub struct LoopbackSession {
    version: String,
    next_handle: u64,
    torrents: HashMap<EngineHandle, LoopbackTorrent>,
    pending: Vec<EngineEvent>,
}

struct LoopbackTorrent {
    info_hash: String,
    name_hint: String,
    save_path: PathBuf,
    sequential: bool,
    paused: bool,
    metadata: Option<TorrentMetadata>,
    progress_ppm: u64,
}

impl LoopbackTorrent {
    fn finished(&self) -> bool {
        self.progress_ppm >= PPM_COMPLETE
    }

    fn state_name(&self) -> &'static str {
        if self.metadata.is_none() {
            "downloading_metadata"
        } else if self.finished() {
            "seeding"
        } else {
            "downloading"
        }
    }

    fn status(&self) -> RawStatus {
        let transferring = !self.paused && self.metadata.is_some() && !self.finished();
        let rate = if transferring { SIMULATED_RATE } else { 0 };
        let total_wanted = if self.metadata.is_some() {
            SIMULATED_SIZE
        } else {
            0
        };
        let mut flags = 0;
        if self.paused {
            flags |= PAUSED_FLAG;
        }
        if self.sequential {
            flags |= SEQUENTIAL_FLAG;
        }
        RawStatus::new()
            .with("progress_ppm", self.progress_ppm)
            .with("download_payload_rate", rate)
            .with("upload_payload_rate", rate / 8)
            .with("peers", if transferring { 8 } else { 0 })
            .with("list_seeds", if transferring { 3 } else { 0 })
            .with("state_name", self.state_name())
            .with(
                "total_wanted_done",
                total_wanted * self.progress_ppm.min(PPM_COMPLETE) / PPM_COMPLETE,
            )
            .with("total_size", total_wanted)
            .with("flags", flags)
            .with("errc", json!({"value": 0, "message": ""}))
            .with("save_path", self.save_path.to_string_lossy().into_owned())
    }
}

impl LoopbackSession {
    /// Create a session configured with `settings`.
    #[must_use]
    pub fn new(settings: &EngineSettings) -> Self {
        info!(
            listen_interfaces = ?settings.listen_interfaces,
            dht_bootstrap_nodes = settings.dht_bootstrap_nodes.len(),
            dht = settings.enable_dht,
            lsd = settings.enable_lsd,
            upnp = settings.enable_upnp,
            "loopback engine session created"
        );
        Self {
            version: format!("loopback/{}", env!("CARGO_PKG_VERSION")),
            next_handle: 1,
            torrents: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn torrent_mut(&mut self, handle: EngineHandle) -> Result<&mut LoopbackTorrent> {
        self.torrents
            .get_mut(&handle)
            .ok_or_else(|| anyhow!("invalid torrent handle {handle}"))
    }

    fn torrent(&self, handle: EngineHandle) -> Result<&LoopbackTorrent> {
        self.torrents
            .get(&handle)
            .ok_or_else(|| anyhow!("invalid torrent handle {handle}"))
    }

    fn advance(&mut self) {
        let mut handles: Vec<EngineHandle> = self.torrents.keys().copied().collect();
        handles.sort_by_key(|handle| handle.get());
        for handle in handles {
            let Some(torrent) = self.torrents.get_mut(&handle) else {
                continue;
            };
            if torrent.metadata.is_none() {
                let name = torrent.name_hint.clone();
                torrent.metadata = Some(TorrentMetadata {
                    name: name.clone(),
                    files: vec![JobFile {
                        path: name.clone(),
                        size: SIMULATED_SIZE,
                    }],
                });
                self.pending
                    .push(EngineEvent::MetadataResolved { handle, name });
                self.pending.push(EngineEvent::StateChanged {
                    handle,
                    state: StateLabel::Downloading,
                });
            } else if !torrent.paused && !torrent.finished() {
                torrent.progress_ppm = (torrent.progress_ppm + PROGRESS_STEP_PPM).min(PPM_COMPLETE);
                if torrent.finished() {
                    self.pending.push(EngineEvent::Finished { handle });
                    self.pending.push(EngineEvent::StateChanged {
                        handle,
                        state: StateLabel::Seeding,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl EngineSession for LoopbackSession {
    fn version(&self) -> String {
        self.version.clone()
    }

    async fn add_torrent(&mut self, params: &AddParams) -> Result<AddedTorrent> {
        let submission = MagnetSubmission::parse(&params.magnet).map_err(|err| match err {
            JobError::Validation { reason } => anyhow!("invalid magnet uri: {reason}"),
            other => anyhow!("invalid magnet uri: {other}"),
        })?;
        let info_hash = submission.fingerprint().to_hex();

        if let Some((handle, _)) = self
            .torrents
            .iter()
            .find(|(_, torrent)| torrent.info_hash == info_hash)
        {
            debug!(%handle, info_hash = %info_hash, "loopback add matched existing transfer");
            return Ok(AddedTorrent {
                handle: *handle,
                canonical_id: JobId::new(info_hash),
            });
        }

        let handle = EngineHandle::new(self.next_handle);
        self.next_handle += 1;
        let name_hint = submission.display_name().to_string();
        self.torrents.insert(
            handle,
            LoopbackTorrent {
                info_hash: info_hash.clone(),
                name_hint,
                save_path: params.save_path.clone(),
                sequential: params.sequential,
                paused: false,
                metadata: None,
                progress_ppm: 0,
            },
        );
        self.pending.push(EngineEvent::StateChanged {
            handle,
            state: StateLabel::Checking,
        });
        Ok(AddedTorrent {
            handle,
            canonical_id: JobId::new(info_hash),
        })
    }

    async fn pause(&mut self, handle: EngineHandle) -> Result<()> {
        self.torrent_mut(handle)?.paused = true;
        self.pending.push(EngineEvent::StateChanged {
            handle,
            state: StateLabel::Paused,
        });
        Ok(())
    }

    async fn resume(&mut self, handle: EngineHandle) -> Result<()> {
        let torrent = self.torrent_mut(handle)?;
        torrent.paused = false;
        let state = if torrent.finished() {
            StateLabel::Seeding
        } else {
            StateLabel::Downloading
        };
        self.pending.push(EngineEvent::StateChanged { handle, state });
        Ok(())
    }

    async fn remove(&mut self, handle: EngineHandle) -> Result<()> {
        self.torrents
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| anyhow!("invalid torrent handle {handle}"))
    }

    async fn status_of(&mut self, handle: EngineHandle) -> Result<RawStatus> {
        Ok(self.torrent(handle)?.status())
    }

    async fn metadata_of(&mut self, handle: EngineHandle) -> Result<Option<TorrentMetadata>> {
        Ok(self.torrent(handle)?.metadata.clone())
    }

    async fn pop_alerts(&mut self) -> Result<Vec<EngineEvent>> {
        self.advance();
        Ok(std::mem::take(&mut self.pending))
    }
}
