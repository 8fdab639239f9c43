// src/config/mod.rs
mod settings;
mod value;

pub use settings::*;
pub use value::{ConfigMap, ConfigValue};

use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("missing required config key {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("backend list is empty")]
    EmptyBackendList,

    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },
}

/// Load a config file (YAML or JSON) into a flattened `ConfigMap`.
///
/// The top level must be an object. Keys whose values are neither a string
/// nor an array of strings are skipped with a warning.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<ConfigMap, ConfigError> {
    let path = path.as_ref();
    info!("Loading config from {}", path.display());

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let extension = path.extension().and_then(|s| s.to_str());
    let raw: BTreeMap<String, ConfigValue> = if extension == Some("yaml") || extension == Some("yml") {
        serde_yaml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };

    Ok(ConfigMap::from_values(raw))
}
