//! The `Boombox` interceptor.
//!
//! Install it with [`Boombox::layer`]. Every response that carries a 5xx
//! [`HttpException`] is checked against the catalog; a match is replaced by
//! the catalog's error and, unless logging is disabled, audited.

mod boom;
mod extractor;

pub use boom::{BoomOptions, Boomed};
pub use extractor::BoomboxLookup;

use crate::audit::{AuditLogger, AuditSink, Credentials, RequestSnapshot, TracingSink};
use crate::catalog::{CatalogEntry, ErrorCatalog};
use crate::config::BoomboxOptions;
use crate::error::Result;
use crate::exception::HttpException;
use crate::interceptor::{Interceptor, InterceptorLayer, InterceptorResult, Next};
use crate::remap::{ErrorRemapper, PreResponse};
use crate::route::RouteSettings;
use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::http::{HeaderMap, Request, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;

/// Handle to one boombox instance. Cheap to clone; every clone shares the
/// same catalog and audit sink.
#[derive(Clone)]
pub struct Boombox {
    inner: Arc<BoomboxInner>,
}

struct BoomboxInner {
    remapper: ErrorRemapper,
    audit: Option<AuditLogger>,
    payload_limit: usize,
}

impl Boombox {
    /// Audit records go to [`TracingSink`].
    pub fn new(options: BoomboxOptions) -> Self {
        Self::with_sink(options, TracingSink)
    }

    pub fn with_sink(options: BoomboxOptions, sink: impl AuditSink) -> Self {
        let audit = (!options.disable_log).then(|| AuditLogger::new(sink));

        tracing::info!(
            errors = options.errors.len(),
            disable_log = options.disable_log,
            "boombox enabled"
        );

        Self {
            inner: Arc::new(BoomboxInner {
                remapper: ErrorRemapper::new(options.errors),
                audit,
                payload_limit: options.payload_limit,
            }),
        }
    }

    /// Builds from raw JSON options, failing on a malformed catalog.
    pub fn from_options_value(value: Value) -> Result<Self> {
        Ok(Self::new(BoomboxOptions::from_value(value)?))
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(BoomboxOptions::from_env()?))
    }

    pub fn catalog(&self) -> &ErrorCatalog {
        self.inner.remapper.catalog()
    }

    pub fn is_logging(&self) -> bool {
        self.inner.audit.is_some()
    }

    /// The catalog entry for `error`'s message, without remapping anything.
    pub fn find<E: Display + ?Sized>(&self, error: Option<&E>) -> Option<&CatalogEntry> {
        self.inner.remapper.find(error)
    }

    pub fn remap(&self, error: &HttpException, settings: Option<&RouteSettings>) -> PreResponse {
        self.inner.remapper.remap(error, settings)
    }

    /// A tower layer running this boombox, for `Router::layer`.
    pub fn layer(&self) -> InterceptorLayer {
        InterceptorLayer::new(vec![Arc::new(self.clone()) as Arc<dyn Interceptor>])
    }

    /// Swaps a pending response for its catalog replacement, if it has one.
    pub fn on_pre_response(&self, response: Response) -> Response {
        let Some(error) = response.extensions().get::<HttpException>() else {
            return response;
        };

        match self.remap(error, response.extensions().get::<RouteSettings>()) {
            PreResponse::Continue => response,
            PreResponse::Replace(replacement) => {
                tracing::debug!(
                    key = %error.message(),
                    status = replacement.status().as_u16(),
                    "remapped server error"
                );
                let credentials = response.extensions().get::<Credentials>().cloned();
                let mut replaced = replacement.into_response();
                if let Some(credentials) = credentials {
                    replaced.extensions_mut().insert(credentials);
                }
                replaced
            }
        }
    }

    /// Buffers a small JSON body so it can be audited, then hands it back.
    async fn capture_payload(
        &self,
        headers: &HeaderMap,
        body: Body,
    ) -> std::result::Result<(Option<Value>, Body), HttpException> {
        let fits = body
            .size_hint()
            .upper()
            .is_some_and(|len| len <= self.inner.payload_limit as u64);

        if !is_json(headers) || !fits {
            return Ok((None, body));
        }

        let bytes = axum::body::to_bytes(body, self.inner.payload_limit)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "failed to read request payload");
                HttpException::bad_request("Invalid request payload input")
            })?;

        let payload = serde_json::from_slice(&bytes).ok();
        Ok((payload, Body::from(bytes)))
    }
}

#[async_trait]
impl Interceptor for Boombox {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
        let (mut parts, body) = request.into_parts();

        let mut snapshot =
            RequestSnapshot::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone());
        snapshot.credentials = parts.extensions.get::<Credentials>().cloned();

        let body = if self.inner.audit.is_some() {
            let (payload, body) = self.capture_payload(&parts.headers, body).await?;
            snapshot.payload = payload;
            body
        } else {
            body
        };

        parts.extensions.insert(self.clone());

        let response = next.run(Request::from_parts(parts, body)).await?;
        let mut response = self.on_pre_response(response);

        if let Some(audit) = &self.inner.audit {
            audit.log(&snapshot, &mut response);
        }

        Ok(response)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}
