// src/config/value.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A single top-level value from the config document.
///
/// Anything that is not a string or a list of strings lands in
/// `Unsupported`, including lists that mix in non-string items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    List(Vec<String>),
    Unsupported(serde_json::Value),
}

impl ConfigValue {
    /// Flatten to the string form, `None` for unsupported values.
    pub fn flatten(&self) -> Option<String> {
        match self {
            ConfigValue::Text(text) => Some(text.clone()),
            ConfigValue::List(items) => Some(items.join(",")),
            ConfigValue::Unsupported(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Text(_) => "string",
            ConfigValue::List(_) => "array of strings",
            ConfigValue::Unsupported(value) => match value {
                serde_json::Value::Null => "null",
                serde_json::Value::Bool(_) => "bool",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Array(_) => "mixed array",
                serde_json::Value::Object(_) => "object",
            },
        }
    }
}

/// Flattened key/value configuration, produced once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigMap {
    values: BTreeMap<String, String>,
    skipped: Vec<String>,
}

impl ConfigMap {
    pub fn from_values(raw: BTreeMap<String, ConfigValue>) -> Self {
        let mut map = ConfigMap::default();

        for (key, value) in raw {
            match value.flatten() {
                Some(flat) => {
                    debug!("Setting config key {}", key);
                    map.values.insert(key, flat);
                }
                None => {
                    warn!(
                        "Unsupported type ({}) for key {}, expected string or array of strings",
                        value.kind(),
                        key
                    );
                    map.skipped.push(key);
                }
            }
        }

        map
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Keys dropped because their value type was not supported.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            skipped: Vec::new(),
        }
    }
}
