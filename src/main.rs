// src/main.rs
use anyhow::{Context, Result};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tracing::{error, info};

use round_robin_proxy::{
    config::{self, MetricsSettings, Settings},
    metrics::MetricsRegistry,
    proxy::{BackendPool, Proxy},
    server::{cors_layer, listener::bind_tcp, RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("round_robin_proxy=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());

    let config_map = config::load_config(&config_path)
        .await
        .with_context(|| format!("failed to load configuration from {config_path}"))?;
    let settings = Settings::from_config_map(&config_map).context("invalid configuration")?;

    // Create backend pool
    let pool = Arc::new(BackendPool::new(&settings.backends).context("invalid backend list")?);

    // Create proxy
    let mut proxy = Proxy::new(pool.clone(), settings.upstream_timeout());

    // Start metrics server if enabled
    if let Some(metrics_settings) = &settings.metrics {
        let registry = MetricsRegistry::new()?;
        let collector = registry.collector();
        collector.set_backend_count(pool.len());
        proxy = proxy.with_metrics(collector);
        start_metrics_server(metrics_settings, registry)?;
    }

    let handler = ServiceBuilder::new()
        .layer(cors_layer())
        .service(RequestHandler::new(Arc::new(proxy)));

    let listener = match bind_tcp(settings.listen_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to start server: {:#}", err);
            std::process::exit(1);
        }
    };

    info!("Starting proxy on {}", settings.listen_addr);

    ServerBuilder::new(listener)
        .with_handler(handler)
        .with_shutdown(shutdown_signal())
        .serve()
        .await
}

fn start_metrics_server(settings: &MetricsSettings, registry: MetricsRegistry) -> Result<()> {
    let addr: SocketAddr = settings.addr;
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(settings.path.clone());
    let service_path = metrics_path.clone();

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move {
                    let mut response = if req.uri().path() != path.as_str() {
                        let mut response = Response::new(Body::from("Not Found"));
                        *response.status_mut() = StatusCode::NOT_FOUND;
                        response
                    } else {
                        match registry.gather() {
                            Ok(metrics) => Response::new(Body::from(metrics)),
                            Err(err) => {
                                error!("Failed to encode metrics: {}", err);
                                let mut response = Response::new(Body::empty());
                                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                response
                            }
                        }
                    };
                    if response.status() == StatusCode::OK {
                        response.headers_mut().insert(
                            hyper::header::CONTENT_TYPE,
                            hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
                        );
                    }
                    Ok::<_, Infallible>(response)
                }
            }))
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("failed to bind metrics server on {addr}"))?
        .serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
