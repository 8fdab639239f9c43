// src/server/handler.rs
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tower::{BoxError, Service};

use crate::proxy::{HttpsClient, Proxy};

/// tower `Service` front for a shared [`Proxy`]. Never errors: backend
/// failures are already turned into gateway responses by the proxy.
pub struct RequestHandler<C = HttpsClient> {
    proxy: Arc<Proxy<C>>,
}

impl<C> RequestHandler<C> {
    pub fn new(proxy: Arc<Proxy<C>>) -> Self {
        Self { proxy }
    }
}

impl<C> Clone for RequestHandler<C> {
    fn clone(&self) -> Self {
        Self {
            proxy: self.proxy.clone(),
        }
    }
}

impl<C> Service<Request<Body>> for RequestHandler<C>
where
    C: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let proxy = self.proxy.clone();
        Box::pin(async move { Ok(proxy.handle(req).await) })
    }
}
