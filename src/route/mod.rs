//! Per-route boombox settings.
//!
//! The interceptor sits outside the router, so it cannot see route
//! configuration directly. Instead a route-level layer stamps
//! [`RouteSettings`] into the response extensions on the way out.
//!
//! ```
//! use axum::{Router, routing::get};
//! use boombox::{HttpException, route};
//!
//! let app: Router = Router::new().route(
//!     "/raw",
//!     get(|| async { Err::<(), _>(HttpException::internal("ERROR_KEY_1")) })
//!         .layer(route::exempt()),
//! );
//! ```

use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteSettings {
    /// Skip remapping for this route.
    pub disable: bool,
}

/// Layer that marks a route as exempt from remapping.
pub fn exempt() -> RouteSettingsLayer {
    RouteSettingsLayer::new(RouteSettings { disable: true })
}

#[derive(Debug, Clone, Copy)]
pub struct RouteSettingsLayer {
    settings: RouteSettings,
}

impl RouteSettingsLayer {
    pub fn new(settings: RouteSettings) -> Self {
        Self { settings }
    }
}

impl<S> Layer<S> for RouteSettingsLayer {
    type Service = RouteSettingsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RouteSettingsService {
            inner,
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteSettingsService<S> {
    inner: S,
    settings: RouteSettings,
}

impl<S> Service<Request<Body>> for RouteSettingsService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let settings = self.settings;
        let future = self.inner.call(request);

        Box::pin(async move {
            let mut response = future.await?;
            response.extensions_mut().insert(settings);
            Ok(response)
        })
    }
}
