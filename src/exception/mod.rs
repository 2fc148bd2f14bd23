use axum::response::Response;
use std::error::Error;

pub mod http;
pub mod kind;

pub use http::{ExceptionOutput, HttpException, HttpExceptionFilter, INTERNAL_SERVER_ERROR_MESSAGE};
pub use kind::ErrorKind;

/// The ExceptionFilter trait
///
/// Filters turn errors escaping the interceptor chain into responses.
/// They must return a valid Response.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch an exception and return a response
    fn catch(&self, error: Box<dyn Error + Send + Sync>) -> Response;
}
