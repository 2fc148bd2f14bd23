use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;

pub mod layer;

pub use layer::{InterceptorLayer, InterceptorMiddleware};

/// standard return type for Interceptors
pub type InterceptorResult = Result<Response, InterceptorError>;

/// A type-erased error for interceptors
pub type InterceptorError = Box<dyn std::error::Error + Send + Sync>;

/// The boxed future every link of the chain returns
pub type BoxInterceptorFuture = Pin<Box<dyn Future<Output = InterceptorResult> + Send>>;

type RunFn = Box<dyn FnOnce(Request<Body>) -> BoxInterceptorFuture + Send>;

/// Represents the next handler in the chain
pub struct Next {
    pub(crate) run: RunFn,
}

impl Next {
    /// Create a new Next handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxInterceptorFuture + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// The Interceptor trait
///
/// Interceptors can inspect/modify the request before it reaches the handler,
/// and inspect/modify the response after the handler returns.
///
/// # Example
/// ```
/// use boombox::interceptor::{Interceptor, InterceptorResult, Next};
/// use boombox::async_trait;
/// use axum::{body::Body, http::Request};
///
/// struct Timing;
///
/// #[async_trait]
/// impl Interceptor for Timing {
///     async fn intercept(&self, req: Request<Body>, next: Next) -> InterceptorResult {
///         let start = std::time::Instant::now();
///         let res = next.run(req).await?;
///         tracing::debug!(elapsed = ?start.elapsed(), "handled");
///         Ok(res)
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
