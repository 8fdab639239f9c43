// src/config/settings.rs
use super::{ConfigError, ConfigMap};
use std::net::SocketAddr;
use std::time::Duration;

pub const BACKENDS_KEY: &str = "BACKENDS";
pub const LISTEN_ADDR_KEY: &str = "LISTEN_ADDR";
pub const UPSTREAM_TIMEOUT_KEY: &str = "UPSTREAM_TIMEOUT_SECS";
pub const METRICS_ADDR_KEY: &str = "METRICS_ADDR";
pub const METRICS_PATH_KEY: &str = "METRICS_PATH";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Typed startup configuration, built once from a `ConfigMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Raw backend entries, split and trimmed. Validated by `BackendPool`.
    pub backends: Vec<String>,
    pub listen_addr: SocketAddr,
    pub upstream_timeout_secs: u64,
    pub metrics: Option<MetricsSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSettings {
    pub addr: SocketAddr,
    pub path: String,
}

impl Settings {
    pub fn from_config_map(map: &ConfigMap) -> Result<Self, ConfigError> {
        let backends = split_backend_list(
            map.get(BACKENDS_KEY)
                .ok_or(ConfigError::MissingKey(BACKENDS_KEY))?,
        );
        if backends.is_empty() {
            return Err(ConfigError::EmptyBackendList);
        }

        let listen_addr = parse_addr(
            LISTEN_ADDR_KEY,
            map.get(LISTEN_ADDR_KEY).unwrap_or(DEFAULT_LISTEN_ADDR),
        )?;

        let upstream_timeout_secs = match map.get(UPSTREAM_TIMEOUT_KEY) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: UPSTREAM_TIMEOUT_KEY,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: UPSTREAM_TIMEOUT_KEY,
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let metrics = match map.get(METRICS_ADDR_KEY) {
            Some(addr) => {
                let path = map.get(METRICS_PATH_KEY).unwrap_or(DEFAULT_METRICS_PATH);
                if !path.starts_with('/') {
                    return Err(ConfigError::InvalidValue {
                        key: METRICS_PATH_KEY,
                        reason: "must start with '/'".to_string(),
                    });
                }
                Some(MetricsSettings {
                    addr: parse_addr(METRICS_ADDR_KEY, addr)?,
                    path: path.to_string(),
                })
            }
            None => None,
        };

        Ok(Self {
            backends,
            listen_addr,
            upstream_timeout_secs,
            metrics,
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Split a comma-separated backend list. Entries are trimmed and empty
/// segments dropped.
pub fn split_backend_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_addr(key: &'static str, raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
        key,
        reason: e.to_string(),
    })
}
