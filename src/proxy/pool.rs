// src/proxy/pool.rs
use super::backend::Backend;
use crate::config::ConfigError;
use crate::load_balancer::{LoadBalancer, RoundRobinBalancer};
use std::sync::Arc;

/// Fixed, ordered set of backends plus the selection state.
///
/// The selection counter lives inside the balancer and is only reachable
/// through [`BackendPool::next`].
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendPool {
    /// Build a round-robin pool. Fails if `urls` is empty or any entry is
    /// not a valid backend base URL.
    pub fn new<I, S>(urls: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_balancer(urls, RoundRobinBalancer::new())
    }

    pub fn with_balancer<I, S, L>(urls: I, balancer: L) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        L: LoadBalancer + 'static,
    {
        let backends = urls
            .into_iter()
            .map(|url| Backend::parse(url.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        if backends.is_empty() {
            return Err(ConfigError::EmptyBackendList);
        }

        tracing::info!(
            "Backend pool ready: {} backend(s), {} selection",
            backends.len(),
            balancer.name()
        );

        Ok(Self {
            backends,
            balancer: Box::new(balancer),
        })
    }

    /// Select the next backend.
    pub fn next(&self) -> Arc<Backend> {
        let index = self.balancer.select_index(self.backends.len());
        self.backends[index].clone()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }
}

impl std::fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendPool")
            .field("backends", &self.backends.iter().map(|b| b.base()).collect::<Vec<_>>())
            .field("balancer", &self.balancer.name())
            .finish()
    }
}
