// ────────────────────────────────
// src/proxy/proxy.rs
// Request dispatcher: id, select, rewrite, forward, relay.
// ────────────────────────────────

use super::context::RequestContext;
use super::pool::BackendPool;
use crate::metrics::{method_label, MetricsCollector};
use hyper::client::HttpConnector;
use hyper::header::{self, HeaderMap, CONTENT_TYPE};
use hyper::{Body, Request, Response, StatusCode, Version};
use hyper_tls::HttpsConnector;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{BoxError, Service, ServiceExt};
use tracing::{info, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Default upstream client: plain HTTP and HTTPS backends.
pub type HttpsClient = hyper::Client<HttpsConnector<HttpConnector>, Body>;

// Connection-scoped headers, never relayed in either direction.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "proxy-authenticate",
    "proxy-authorization",
];

pub struct Proxy<C = HttpsClient> {
    pool: Arc<BackendPool>,
    client: C,
    upstream_timeout: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Proxy<HttpsClient> {
    pub fn new(pool: Arc<BackendPool>, upstream_timeout: Duration) -> Self {
        let client = hyper::Client::builder().build(HttpsConnector::new());
        Self::with_client(pool, client, upstream_timeout)
    }
}

impl<C> Proxy<C>
where
    C: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    /// Use any tower service as the upstream client.
    pub fn with_client(pool: Arc<BackendPool>, client: C, upstream_timeout: Duration) -> Self {
        Self {
            pool,
            client,
            upstream_timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run one request/response cycle. Backend failures become gateway
    /// responses; this never fails.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let request_id = RequestContext::generate_request_id();
        let backend = self.pool.next();
        let ctx = RequestContext::new(request_id, req.uri(), backend);
        let method = req.method().clone();

        info!(
            request_id = %ctx.request_id,
            backend = %ctx.backend.base(),
            %method,
            path = %ctx.original_path,
            "Forwarding request"
        );

        let result = self.forward(&ctx, req).await;
        ctx.backend.record_request(result.is_ok());
        if let Some(metrics) = &self.metrics {
            metrics.record_backend_request(&ctx.backend.id, result.is_ok(), start.elapsed());
        }

        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    request_id = %ctx.request_id,
                    backend = %ctx.backend.base(),
                    error = %err,
                    "Upstream request failed"
                );
                err.into()
            }
        };

        strip_hop_by_hop(response.headers_mut());
        if let Ok(value) = ctx.request_id_header() {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_request(
                method_label(&method),
                response.status().as_u16(),
                &ctx.backend.id,
                start.elapsed(),
            );
        }

        response
    }

    async fn forward(
        &self,
        ctx: &RequestContext,
        req: Request<Body>,
    ) -> Result<Response<Body>, ProxyError> {
        let (mut parts, body) = req.into_parts();

        parts.uri = ctx.target_uri()?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::HOST);
        parts.headers.insert(REQUEST_ID_HEADER, ctx.request_id_header()?);

        let upstream = Request::from_parts(parts, body);
        let call = self.client.clone().oneshot(upstream);

        match tokio::time::timeout(self.upstream_timeout, call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                let err: BoxError = err.into();
                Err(ProxyError::BackendUnavailable(err.to_string()))
            }
            Err(_) => Err(ProxyError::Timeout),
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Names listed in `Connection` are hop-by-hop too.
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    for name in &listed {
        headers.remove(name.as_str());
    }

    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid upstream target: {0}")]
    InvalidTarget(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BackendUnavailable(_) | ProxyError::InvalidTarget(_) => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

// Gateway errors carry only a short status message, no upstream details.
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let status = err.status();
        let message = match err {
            ProxyError::Timeout => "Gateway timeout",
            ProxyError::BackendUnavailable(_) | ProxyError::InvalidTarget(_) => "Bad gateway",
        };

        let mut response = Response::new(Body::from(message));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, header::HeaderValue::from_static("text/plain"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use std::convert::Infallible;

    fn pool(urls: &[&str]) -> Arc<BackendPool> {
        Arc::new(BackendPool::new(urls.iter().copied()).unwrap())
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn forwards_to_base_plus_path_and_tags_both_sides() {
        let echo = tower::service_fn(|req: Request<Body>| async move {
            let seen_id = req.headers()[REQUEST_ID_HEADER].clone();
            let has_host = req.headers().contains_key(header::HOST);
            let body = format!("{} {} host={}", req.method(), req.uri(), has_host);
            Ok::<_, Infallible>(
                Response::builder()
                    .status(StatusCode::CREATED)
                    .header("x-seen-request-id", seen_id)
                    .header(header::CONNECTION, "keep-alive")
                    .body(Body::from(body))
                    .unwrap(),
            )
        });
        let proxy = Proxy::with_client(pool(&["http://h1"]), echo, Duration::from_secs(5));

        let req = Request::builder()
            .method("POST")
            .uri("/a/b?x=1")
            .header(header::HOST, "proxy.local")
            .header(REQUEST_ID_HEADER, "caller-supplied")
            .header(header::CONNECTION, "close")
            .body(Body::empty())
            .unwrap();
        let response = proxy.handle(req).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let sent = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        let seen = response.headers()["x-seen-request-id"].to_str().unwrap().to_string();
        assert_eq!(sent, seen);
        assert_ne!(sent, "caller-supplied");
        assert!(!response.headers().contains_key(header::CONNECTION));
        assert_eq!(body_string(response).await, "POST http://h1/a/b?x=1 host=false");
    }

    #[tokio::test]
    async fn headers_named_in_connection_are_not_relayed() {
        let echo = tower::service_fn(|req: Request<Body>| async move {
            let body = format!(
                "hop={} keep={}",
                req.headers().contains_key("x-hop-only"),
                req.headers().contains_key("x-end-to-end")
            );
            Ok::<_, Infallible>(
                Response::builder()
                    .header(header::CONNECTION, "x-backend-hop")
                    .header("x-backend-hop", "1")
                    .header("x-backend-kept", "1")
                    .body(Body::from(body))
                    .unwrap(),
            )
        });
        let proxy = Proxy::with_client(pool(&["http://h1"]), echo, Duration::from_secs(5));

        let req = Request::builder()
            .uri("/")
            .header(header::CONNECTION, "close, X-Hop-Only")
            .header("x-hop-only", "secret")
            .header("x-end-to-end", "1")
            .body(Body::empty())
            .unwrap();
        let response = proxy.handle(req).await;

        assert!(!response.headers().contains_key("x-backend-hop"));
        assert!(response.headers().contains_key("x-backend-kept"));
        assert_eq!(body_string(response).await, "hop=false keep=true");
    }

    #[tokio::test]
    async fn extension_methods_share_one_metrics_series() {
        let registry = MetricsRegistry::new().unwrap();
        let ok = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        let proxy = Proxy::with_client(pool(&["http://h1"]), ok, Duration::from_secs(5))
            .with_metrics(registry.collector());

        for method in ["PURGE", "FROBNICATE"] {
            let req = Request::builder()
                .method(method)
                .uri("/")
                .body(Body::empty())
                .unwrap();
            proxy.handle(req).await;
        }

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains(
            r#"proxy_requests_total{backend="http://h1",method="OTHER",status_code="200"} 2"#
        ));
        assert!(!text.contains("PURGE"));
        assert!(!text.contains("FROBNICATE"));
    }

    #[tokio::test]
    async fn upstream_error_becomes_bad_gateway_with_request_id() {
        let failing = tower::service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, BoxError>("connection refused".into())
        });
        let pool = pool(&["http://h1"]);
        let proxy = Proxy::with_client(pool.clone(), failing, Duration::from_secs(5));

        let response = proxy.handle(Request::new(Body::empty())).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body_string(response).await, "Bad gateway");
        assert_eq!(pool.all_backends()[0].get_metrics().failed_requests, 1);
    }

    #[tokio::test]
    async fn slow_upstream_becomes_gateway_timeout() {
        let slow = tower::service_fn(|_req: Request<Body>| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        let proxy = Proxy::with_client(pool(&["http://h1"]), slow, Duration::from_millis(50));

        let response = proxy.handle(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn error_statuses_are_gateway_class() {
        assert_eq!(ProxyError::BackendUnavailable("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ProxyError::InvalidTarget("x".into()).status(), StatusCode::BAD_GATEWAY);
    }
}
