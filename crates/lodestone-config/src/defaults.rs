//! Default values mirrored by [`crate::ServerConfig::default`].

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

pub(crate) const BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub(crate) const HTTP_PORT: u16 = 10_000;
pub(crate) const DOWNLOAD_ROOT: &str = "/tmp/downloads";
pub(crate) const READINESS_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const ALERT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub(crate) const LISTEN_INTERFACES: &[&str] = &["0.0.0.0:6881"];
pub(crate) const DHT_BOOTSTRAP_NODES: &[&str] = &[
    "router.bittorrent.com:6881",
    "router.utorrent.com:6881",
    "dht.transmissionbt.com:6881",
];
pub(crate) const LOG_LEVEL: &str = "info";
