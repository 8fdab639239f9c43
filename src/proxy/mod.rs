// src/proxy/mod.rs
mod backend;
mod context;
mod pool;
mod proxy;

pub use backend::{Backend, BackendMetrics};
pub use context::RequestContext;
pub use pool::BackendPool;
pub use proxy::{HttpsClient, Proxy, ProxyError, REQUEST_ID_HEADER};
