//! Garbage collection middleware for tower applications.
//!
//! This module provides [`GcLayer`], which gives every completed request a
//! chance to trigger [`SessionManager::collect_garbage`].

use http::Request;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tower::{Layer, Service};

use crate::SessionManager;

/// A Tower Middleware that runs session garbage collection after requests.
#[derive(Clone, Debug)]
pub struct GcService<S> {
    inner: S,
    manager: Arc<SessionManager>,
}

impl<ReqBody, S> Service<Request<ReqBody>> for GcService<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        ResponseFuture {
            future: self.inner.call(req),
            manager: Some(Arc::clone(&self.manager)),
        }
    }
}

/// Layer to apply [`GcService`] middleware.
///
/// Collection runs on a spawned tokio task once the inner response is ready,
/// so it never delays the response itself.
///
/// # Example
///
/// ```rust
/// use sesman::store::{BackendRegistry, MemoryStore};
/// use sesman::{GcLayer, SessionConfig, SessionManager};
/// use std::sync::Arc;
///
/// let registry = BackendRegistry::new();
/// registry.register_memory(MemoryStore::new());
///
/// let config = SessionConfig::build().gc_probability(100).gc_max_lifetime(1440);
/// let manager = Arc::new(SessionManager::new(config, registry));
///
/// let gc_layer = GcLayer::new(manager);
/// ```
#[derive(Clone, Debug)]
pub struct GcLayer {
    manager: Arc<SessionManager>,
}

impl GcLayer {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

impl<S> Layer<S> for GcLayer {
    type Service = GcService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GcService {
            inner,
            manager: Arc::clone(&self.manager),
        }
    }
}

pin_project! {
    /// Response future for [`GcService`].
    #[derive(Debug)]
    pub struct ResponseFuture<F> {
        #[pin]
        future: F,
        manager: Option<Arc<SessionManager>>,
    }
}

impl<F> Future for ResponseFuture<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let res = ready!(this.future.poll(cx));

        if let Some(manager) = this.manager.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move { manager.collect_garbage().await });
                }
                Err(_) => {
                    tracing::debug!("no tokio runtime, skipping session garbage collection");
                }
            }
        }

        Poll::Ready(res)
    }
}
