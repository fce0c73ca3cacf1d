//! Tower middleware that puts a named fuse in front of a service.
//!
//! Every request is admitted through [`FuseRegistry::run_result_async`]: a
//! blown fuse rejects the request without calling the inner service, and an
//! inner error melts the fuse.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower_layer::Layer;
use tower_service::Service;

use crate::error::RunError;
use crate::registry::FuseRegistry;

/// A layer that guards services with one fuse of a [`FuseRegistry`].
#[derive(Clone, Debug)]
pub struct FuseLayer {
    registry: FuseRegistry,
    name: Arc<str>,
}

impl FuseLayer {
    /// Guard with the fuse installed as `name`. The fuse must be installed
    /// before requests arrive; unknown names fail each call with `NotFound`.
    pub fn new(registry: FuseRegistry, name: impl Into<Arc<str>>) -> Self {
        Self { registry, name: name.into() }
    }
}

impl<S> Layer<S> for FuseLayer {
    type Service = FuseService<S>;

    fn layer(&self, service: S) -> Self::Service {
        FuseService { inner: service, registry: self.registry.clone(), name: self.name.clone() }
    }
}

/// Middleware service produced by [`FuseLayer`].
#[derive(Clone, Debug)]
pub struct FuseService<S> {
    inner: S,
    registry: FuseRegistry,
    name: Arc<str>,
}

impl<S> FuseService<S> {
    /// Name of the guarding fuse.
    pub fn fuse_name(&self) -> &str {
        &self.name
    }
}

impl<S, Req> Service<Req> for FuseService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = RunError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RunError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // Take the service that was driven to readiness; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let registry = self.registry.clone();
        let name = self.name.clone();

        Box::pin(async move { registry.run_result_async(&name, move || inner.call(req)).await })
    }
}
