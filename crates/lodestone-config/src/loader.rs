//! Environment-backed configuration loading.

use std::path::PathBuf;

use tracing::debug;

use crate::error::ConfigResult;
use crate::model::ServerConfig;
use crate::validate::{
    parse_bind_addr, parse_bool, parse_list, parse_millis, parse_port, parse_seconds, validate,
};

const ENV_BIND_ADDR: &str = "LODESTONE_BIND_ADDR";
const ENV_PORT: &str = "LODESTONE_PORT";
const ENV_PORT_LEGACY: &str = "PORT";
const ENV_DOWNLOAD_DIR: &str = "LODESTONE_DOWNLOAD_DIR";
const ENV_DOWNLOAD_DIR_LEGACY: &str = "DOWNLOAD_DIR";
const ENV_READINESS_TIMEOUT: &str = "LODESTONE_READINESS_TIMEOUT_SECS";
const ENV_COMMAND_TIMEOUT: &str = "LODESTONE_COMMAND_TIMEOUT_SECS";
const ENV_ALERT_POLL: &str = "LODESTONE_ALERT_POLL_MS";
const ENV_LISTEN_INTERFACES: &str = "LODESTONE_LISTEN_INTERFACES";
const ENV_DHT_NODES: &str = "LODESTONE_DHT_BOOTSTRAP_NODES";
const ENV_SEQUENTIAL: &str = "LODESTONE_SEQUENTIAL_DOWNLOAD";
const ENV_LOG_LEVEL: &str = "LODESTONE_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "LODESTONE_LOG_FORMAT";
const ENV_DIAGNOSTICS_TOKEN: &str = "LODESTONE_DIAGNOSTICS_TOKEN";

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidField` when a variable cannot be parsed or
    /// the merged configuration fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup, applying
    /// defaults for anything the lookup does not supply.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidField` when a value cannot be parsed or the
    /// merged configuration fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |primary: &str, legacy: Option<&str>| {
            lookup(primary)
                .or_else(|| legacy.and_then(&lookup))
                .filter(|value| !value.trim().is_empty())
        };

        let mut config = Self::default();
        if let Some(value) = get(ENV_BIND_ADDR, None) {
            config.bind_addr = parse_bind_addr(ENV_BIND_ADDR, &value)?;
        }
        if let Some(value) = get(ENV_PORT, Some(ENV_PORT_LEGACY)) {
            config.http_port = parse_port(ENV_PORT, &value)?;
        }
        if let Some(value) = get(ENV_DOWNLOAD_DIR, Some(ENV_DOWNLOAD_DIR_LEGACY)) {
            config.download_root = PathBuf::from(value.trim());
        }
        if let Some(value) = get(ENV_READINESS_TIMEOUT, None) {
            config.readiness_timeout = parse_seconds(ENV_READINESS_TIMEOUT, &value)?;
        }
        if let Some(value) = get(ENV_COMMAND_TIMEOUT, None) {
            config.command_timeout = parse_seconds(ENV_COMMAND_TIMEOUT, &value)?;
        }
        if let Some(value) = get(ENV_ALERT_POLL, None) {
            config.alert_poll_interval = parse_millis(ENV_ALERT_POLL, &value)?;
        }
        if let Some(value) = get(ENV_LISTEN_INTERFACES, None) {
            config.engine.listen_interfaces = parse_list(&value);
        }
        if let Some(value) = get(ENV_DHT_NODES, None) {
            config.engine.dht_bootstrap_nodes = parse_list(&value);
        }
        if let Some(value) = get(ENV_SEQUENTIAL, None) {
            config.engine.sequential_download = parse_bool(ENV_SEQUENTIAL, &value)?;
        }
        if let Some(value) = get(ENV_LOG_LEVEL, None) {
            config.log_level = value.trim().to_string();
        }
        config.log_format = get(ENV_LOG_FORMAT, None);
        config.diagnostics_token = lookup(ENV_DIAGNOSTICS_TOKEN);

        validate(&config)?;
        debug!(
            bind = %config.socket_addr(),
            download_root = %config.download_root.display(),
            diagnostics_enabled = config.diagnostics_token.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }
}
