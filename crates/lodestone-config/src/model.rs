//! Configuration model.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults;

/// Everything the binary needs to start the engine owner and HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the HTTP listener binds to.
    pub http_port: u16,
    /// Directory jobs save into and downloads are served from.
    pub download_root: PathBuf,
    /// Upper bound a submission waits for engine readiness.
    pub readiness_timeout: Duration,
    /// Upper bound for one engine owner round-trip.
    pub command_timeout: Duration,
    /// How long the engine owner waits for alerts per loop iteration.
    pub alert_poll_interval: Duration,
    /// Engine-level settings applied at initialisation.
    pub engine: EngineSettings,
    /// Log level directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log format name (`json` or `pretty`); inferred from the build when unset.
    pub log_format: Option<String>,
    /// Token operators present to see raw diagnostics; disabled when `None`.
    pub diagnostics_token: Option<String>,
}

/// Settings handed to the engine session when it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Peer listen interfaces (`host:port`).
    pub listen_interfaces: Vec<String>,
    /// DHT bootstrap routers (`host:port`).
    pub dht_bootstrap_nodes: Vec<String>,
    /// Enable the DHT.
    pub enable_dht: bool,
    /// Enable local service discovery.
    pub enable_lsd: bool,
    /// Enable `UPnP` port mapping.
    pub enable_upnp: bool,
    /// Request in-order piece download on every add.
    pub sequential_download: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            listen_interfaces: to_owned(defaults::LISTEN_INTERFACES),
            dht_bootstrap_nodes: to_owned(defaults::DHT_BOOTSTRAP_NODES),
            enable_dht: true,
            enable_lsd: true,
            enable_upnp: true,
            sequential_download: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::BIND_ADDR,
            http_port: defaults::HTTP_PORT,
            download_root: PathBuf::from(defaults::DOWNLOAD_ROOT),
            readiness_timeout: defaults::READINESS_TIMEOUT,
            command_timeout: defaults::COMMAND_TIMEOUT,
            alert_poll_interval: defaults::ALERT_POLL_INTERVAL,
            engine: EngineSettings::default(),
            log_level: defaults::LOG_LEVEL.to_string(),
            log_format: None,
            diagnostics_token: None,
        }
    }
}

impl ServerConfig {
    /// Socket address for the HTTP listener.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
