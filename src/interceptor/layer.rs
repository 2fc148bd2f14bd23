use crate::exception::{ExceptionFilter, HttpExceptionFilter};
use crate::interceptor::{BoxInterceptorFuture, Interceptor, Next};
use axum::{body::Body, http::Request, response::Response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer for invoking a chain of Interceptors
///
/// The first interceptor is the outermost. Errors escaping the chain are
/// rendered by the layer's [`ExceptionFilter`], so the resulting service never
/// fails and can be passed straight to `Router::layer`.
#[derive(Clone)]
pub struct InterceptorLayer {
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
    filter: Arc<dyn ExceptionFilter>,
}

impl InterceptorLayer {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: Arc::new(interceptors),
            filter: Arc::new(HttpExceptionFilter),
        }
    }

    pub fn with_filter(mut self, filter: impl ExceptionFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorMiddleware {
            inner,
            interceptors: Arc::clone(&self.interceptors),
            filter: Arc::clone(&self.filter),
        }
    }
}

#[derive(Clone)]
pub struct InterceptorMiddleware<S> {
    inner: S,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
    filter: Arc<dyn ExceptionFilter>,
}

impl<S> Service<Request<Body>> for InterceptorMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let interceptors = Arc::clone(&self.interceptors);
        let filter = Arc::clone(&self.filter);

        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut chain = Next::new(move |req: Request<Body>| -> BoxInterceptorFuture {
                Box::pin(async move {
                    match inner.call(req).await {
                        Ok(response) => Ok(response),
                        Err(never) => match never {},
                    }
                })
            });

            // interceptors[0] wraps (interceptors[1] wraps ... (inner))
            for interceptor in interceptors.iter().rev() {
                let interceptor = Arc::clone(interceptor);
                let next = chain;
                chain = Next::new(move |req: Request<Body>| -> BoxInterceptorFuture {
                    Box::pin(async move { interceptor.intercept(req, next).await })
                });
            }

            Ok(match chain.run(request).await {
                Ok(response) => response,
                Err(error) => filter.catch(error),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::HttpException;
    use crate::interceptor::InterceptorResult;
    use async_trait::async_trait;
    use axum::{Router, http::StatusCode, routing::get};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct Recorder {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
            self.calls.lock().unwrap().push(format!("{} in", self.name));
            let response = next.run(request).await;
            self.calls.lock().unwrap().push(format!("{} out", self.name));
            response
        }
    }

    struct Rejecting;

    #[async_trait]
    impl Interceptor for Rejecting {
        async fn intercept(&self, _request: Request<Body>, _next: Next) -> InterceptorResult {
            Err(Box::new(HttpException::not_found("nothing here")))
        }
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_chain_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let layer = InterceptorLayer::new(vec![
            Arc::new(Recorder { name: "a", calls: Arc::clone(&calls) }) as Arc<dyn Interceptor>,
            Arc::new(Recorder { name: "b", calls: Arc::clone(&calls) }) as Arc<dyn Interceptor>,
        ]);
        let app = Router::new().route("/", get(|| async { "ok" })).layer(layer);

        let response = app.oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*calls.lock().unwrap(), vec!["a in", "b in", "b out", "a out"]);
    }

    #[tokio::test]
    async fn test_chain_errors_go_through_filter() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(InterceptorLayer::new(vec![Arc::new(Rejecting) as Arc<dyn Interceptor>]));

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    struct Teapot;

    impl ExceptionFilter for Teapot {
        fn catch(&self, error: Box<dyn std::error::Error + Send + Sync>) -> Response {
            use axum::response::IntoResponse;
            (StatusCode::IM_A_TEAPOT, error.to_string()).into_response()
        }
    }

    #[tokio::test]
    async fn test_custom_filter_renders_chain_errors() {
        let layer = InterceptorLayer::new(vec![Arc::new(Rejecting) as Arc<dyn Interceptor>])
            .with_filter(Teapot);
        let app = Router::new().route("/", get(|| async { "ok" })).layer(layer);

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
