// src/proxy/context.rs
use super::backend::Backend;
use super::proxy::ProxyError;
use hyper::header::HeaderValue;
use hyper::Uri;
use std::sync::Arc;
use uuid::Uuid;

/// Per-request state, alive from arrival until the response is returned.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Path and query of the inbound request, untouched.
    pub original_path: String,
    pub backend: Arc<Backend>,
}

impl RequestContext {
    pub fn new(request_id: String, uri: &Uri, backend: Arc<Backend>) -> Self {
        let original_path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        Self {
            request_id,
            original_path,
            backend,
        }
    }

    /// Fresh UUID v4 in hyphenated form.
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn target_uri(&self) -> Result<Uri, ProxyError> {
        let target = self.backend.target_for(&self.original_path);
        target
            .parse::<Uri>()
            .map_err(|e| ProxyError::InvalidTarget(format!("{target}: {e}")))
    }

    pub fn request_id_header(&self) -> Result<HeaderValue, ProxyError> {
        HeaderValue::from_str(&self.request_id)
            .map_err(|e| ProxyError::InvalidTarget(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(uri: &str, backend: &str) -> RequestContext {
        let backend = Arc::new(Backend::parse(backend).unwrap());
        RequestContext::new(
            RequestContext::generate_request_id(),
            &uri.parse().unwrap(),
            backend,
        )
    }

    #[test]
    fn target_uri_is_base_plus_path_and_query() {
        let ctx = context("/a/b?x=1", "http://h1");
        assert_eq!(ctx.original_path, "/a/b?x=1");
        assert_eq!(ctx.target_uri().unwrap().to_string(), "http://h1/a/b?x=1");
    }

    #[test]
    fn absolute_form_requests_keep_only_path_and_query() {
        let ctx = context("http://proxy.local:3000/ping?v=2", "http://h1:9001");
        assert_eq!(ctx.target_uri().unwrap().to_string(), "http://h1:9001/ping?v=2");
    }

    #[test]
    fn request_ids_are_uuid_v4() {
        let id = RequestContext::generate_request_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(id, RequestContext::generate_request_id());
    }
}
