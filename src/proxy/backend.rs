// src/proxy/backend.rs
use crate::config::ConfigError;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

/// An upstream origin server.
#[derive(Debug)]
pub struct Backend {
    pub id: String,
    pub url: Url,
    /// Base used for target construction, trailing '/' trimmed.
    base: String,

    total_requests: AtomicU64,
    failed_requests: AtomicU64,
}

impl Backend {
    /// Parse and validate an absolute `http`/`https` base URL.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBackendUrl {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if !url.has_host() {
            return Err(invalid("missing host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("base URL must not carry a query or fragment".to_string()));
        }

        let base = raw.trim_end_matches('/').to_string();
        // Targets are built from `base`, so it must also be a valid request URI.
        if let Err(e) = format!("{base}/").parse::<hyper::Uri>() {
            return Err(invalid(e.to_string()));
        }

        Ok(Self {
            id: base.clone(),
            url,
            base,
            total_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Backend base concatenated with the original path and query.
    pub fn target_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base, path_and_query)
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_metrics(&self) -> BackendMetrics {
        BackendMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendMetrics {
    pub total_requests: u64,
    pub failed_requests: u64,
}
