//! Validation helpers and parsing utilities for configuration values.

use std::net::IpAddr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ServerConfig;

pub(crate) fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port: u16 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, Some(value), "must be an integer between 1 and 65535"))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, Some(value), "must be between 1 and 65535"));
    }
    Ok(port)
}

pub(crate) fn parse_bind_addr(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, Some(value), "must be an IP address"))
}

pub(crate) fn parse_seconds(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_u64(field, value).map(Duration::from_secs)
}

pub(crate) fn parse_millis(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_u64(field, value).map(Duration::from_millis)
}

pub(crate) fn parse_bool(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, Some(value), "must be a boolean")),
    }
}

pub(crate) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u64(field: &'static str, value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, Some(value), "must be a non-negative integer"))
}

/// Cross-field checks applied after every source has been merged.
pub(crate) fn validate(config: &ServerConfig) -> ConfigResult<()> {
    if config.http_port == 0 {
        return Err(ConfigError::invalid("http_port", None, "must be between 1 and 65535"));
    }
    if config.download_root.as_os_str().is_empty() {
        return Err(ConfigError::invalid("download_root", None, "must not be empty"));
    }
    for (field, value) in [
        ("readiness_timeout", config.readiness_timeout),
        ("command_timeout", config.command_timeout),
        ("alert_poll_interval", config.alert_poll_interval),
    ] {
        if value.is_zero() {
            return Err(ConfigError::invalid(field, None, "must be greater than zero"));
        }
    }
    if config.engine.listen_interfaces.is_empty() {
        return Err(ConfigError::invalid(
            "listen_interfaces",
            None,
            "must name at least one interface",
        ));
    }
    if config
        .diagnostics_token
        .as_deref()
        .is_some_and(|token| token.trim().is_empty())
    {
        return Err(ConfigError::invalid("diagnostics_token", None, "must not be blank"));
    }
    Ok(())
}
