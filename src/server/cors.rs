// src/server/cors.rs
use hyper::Method;
use tower_http::cors::{Any, CorsLayer};

/// Any origin; `GET` and `POST` advertised to browsers. Preflights are
/// answered here, every other request still reaches the proxy whatever its
/// method.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
}
