//! # Boombox
//!
//! Catalog-driven error remapping for axum servers.
//!
//! Handlers fail with an [`HttpException`]. Before the response leaves the
//! server, the [`Boombox`] interceptor looks the error's message up in an
//! [`ErrorCatalog`] and, on a hit, answers with the catalog's status and
//! message instead. Each remapped response produces a structured, redacted
//! [`AuditRecord`](audit::AuditRecord).
//!
//! ## Features
//!
//! - **Friendly errors**: map internal error keys to client-facing status/message pairs
//! - **Server errors only**: 4xx errors are never touched
//! - **Per-route opt-out**: [`route::exempt`] disables remapping for one route
//! - **Audit records**: request metadata with the `password` field and credentials stripped
//! - **Lookup**: [`Boombox::find`] on the instance, [`BoomboxLookup`] per request
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use boombox::{Boombox, BoomboxOptions, HttpException};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let boombox = Boombox::from_options_value(json!({
//!         "errors": {
//!             "ERROR_KEY_1": { "type": "methodNotAllowed", "message": "Error one" }
//!         }
//!     }))?;
//!
//!     // GET /error answers 405 with
//!     // {"statusCode":405,"error":"Method Not Allowed","message":"Error one"}
//!     let app: Router = Router::new()
//!         .route("/error", get(|| async {
//!             Err::<(), _>(HttpException::internal("ERROR_KEY_1"))
//!         }))
//!         .layer(boombox.layer());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod exception;
pub mod interceptor;
pub mod plugin;
pub mod remap;
pub mod route;

// Re-export core types
pub use audit::{AuditLogger, AuditRecord, AuditSink, ChannelSink, Credentials, TracingSink};
pub use catalog::{CatalogEntry, ErrorCatalog};
pub use config::BoomboxOptions;
pub use error::{BoomboxError, Result};
pub use exception::{ErrorKind, ExceptionOutput, HttpException};
pub use plugin::{BoomOptions, Boombox, BoomboxLookup, Boomed};
pub use remap::{ErrorRemapper, PreResponse};
pub use route::RouteSettings;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use boombox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audit::{
        AuditLogger, AuditRecord, AuditSink, ChannelSink, Credentials, TracingSink,
    };
    pub use crate::catalog::{CatalogEntry, ErrorCatalog};
    pub use crate::config::BoomboxOptions;
    pub use crate::error::{BoomboxError, Result};
    pub use crate::exception::{ErrorKind, ExceptionFilter, HttpException, HttpExceptionFilter};
    pub use crate::interceptor::{Interceptor, InterceptorLayer, InterceptorResult, Next};
    pub use crate::plugin::{BoomOptions, Boombox, BoomboxLookup, Boomed};
    pub use crate::remap::{ErrorRemapper, PreResponse};
    pub use crate::route::{self, RouteSettings};
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
