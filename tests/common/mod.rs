// tests/common/mod.rs
#![allow(dead_code)]

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use round_robin_proxy::proxy::{BackendPool, Proxy, REQUEST_ID_HEADER};
use round_robin_proxy::server::{cors_layer, listener::bind_tcp, RequestHandler, ServerBuilder};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;

/// Header an echo backend uses to report the request id it received.
pub const SEEN_REQUEST_ID: &str = "x-seen-request-id";
pub const BACKEND_NAME: &str = "x-backend-name";

pub struct EchoBackend {
    pub url: String,
    pub hits: Arc<AtomicU64>,
}

impl EchoBackend {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Backend replying `"<METHOD> <path?query>"`, with the received request id
/// copied into `x-seen-request-id`.
pub async fn spawn_echo_backend(name: &str) -> EchoBackend {
    let hits = Arc::new(AtomicU64::new(0));
    let name = name.to_string();
    let counter = hits.clone();

    let make_svc = make_service_fn(move |_conn| {
        let name = name.clone();
        let counter = counter.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                counter.fetch_add(1, Ordering::SeqCst);
                let name = name.clone();
                async move {
                    let seen = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .cloned()
                        .unwrap_or_else(|| hyper::header::HeaderValue::from_static("missing"));
                    let path = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_default();
                    let body = format!("{} {}", req.method(), path);

                    Ok::<_, Infallible>(
                        Response::builder()
                            .header(SEEN_REQUEST_ID, seen)
                            .header(BACKEND_NAME, name)
                            .body(Body::from(body))
                            .unwrap(),
                    )
                }
            }))
        }
    });

    let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
    let url = format!("http://{}", server.local_addr());
    tokio::spawn(server);

    EchoBackend { url, hits }
}

/// Address on which nothing is listening.
pub fn refused_backend() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Start the full proxy stack (CORS + handler) on an ephemeral port.
pub async fn spawn_proxy(backends: &[String]) -> SocketAddr {
    let pool = Arc::new(BackendPool::new(backends).unwrap());
    let proxy = Arc::new(Proxy::new(pool, Duration::from_secs(5)));
    let handler = ServiceBuilder::new()
        .layer(cors_layer())
        .service(RequestHandler::new(proxy));

    let listener = bind_tcp(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        ServerBuilder::new(listener)
            .with_handler(handler)
            .serve(),
    );
    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
