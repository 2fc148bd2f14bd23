use crate::exception::{ErrorKind, ExceptionFilter};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Public message for organic server errors, so internal messages never leak.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "An internal server error occurred";

/// The error type handlers return.
///
/// `message` is internal: it is the key the catalog is searched with, and for
/// server-class errors it never reaches the client. What the client sees is
/// [`HttpException::output`].
///
/// ```
/// use boombox::HttpException;
///
/// async fn handler() -> Result<&'static str, HttpException> {
///     Err(HttpException::internal("ERROR_KEY_1"))
/// }
/// ```
#[derive(Clone)]
pub struct HttpException {
    status: StatusCode,
    message: String,
    substituted: bool,
    catalog_key: Option<String>,
    origin: Arc<Origin>,
}

struct Origin {
    location: &'static Location<'static>,
    backtrace: Backtrace,
}

/// The client-facing body of an [`HttpException`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionOutput {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl HttpException {
    #[track_caller]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            substituted: false,
            catalog_key: None,
            origin: Arc::new(Origin {
                location: Location::caller(),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    #[track_caller]
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind.status_code(), message)
    }

    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Builds the catalog replacement for `self`, keeping the original stack.
    pub(crate) fn substitute(&self, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status_code(),
            message: message.into(),
            substituted: true,
            catalog_key: Some(self.message.clone()),
            origin: Arc::clone(&self.origin),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for 5xx errors. Only these are eligible for remapping.
    pub fn is_server(&self) -> bool {
        self.status.is_server_error()
    }

    /// True when this error was produced from a catalog entry.
    pub fn is_substituted(&self) -> bool {
        self.substituted
    }

    /// The message of the error this one replaced.
    pub fn catalog_key(&self) -> Option<&str> {
        self.catalog_key.as_deref()
    }

    /// Where the error was created: the captured backtrace when
    /// `RUST_BACKTRACE` enables one, otherwise the caller location.
    pub fn stack(&self) -> String {
        match self.origin.backtrace.status() {
            BacktraceStatus::Captured => {
                format!("at {}\n{}", self.origin.location, self.origin.backtrace)
            }
            _ => format!("at {}", self.origin.location),
        }
    }

    pub fn output(&self) -> ExceptionOutput {
        let error = self
            .status
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let message = if self.is_server() && !self.substituted {
            INTERNAL_SERVER_ERROR_MESSAGE.to_string()
        } else if self.message.is_empty() {
            error.clone()
        } else {
            self.message.clone()
        };

        ExceptionOutput {
            status_code: self.status.as_u16(),
            error,
            message,
        }
    }
}

impl fmt::Debug for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpException")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("substituted", &self.substituted)
            .field("location", &self.origin.location)
            .finish()
    }
}

impl fmt::Display for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for HttpException {}

impl From<anyhow::Error> for HttpException {
    #[track_caller]
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<HttpException>() {
            Ok(exception) => exception,
            Err(err) => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for HttpException {
    /// Renders the output body and keeps the exception itself in the response
    /// extensions, where the interceptor picks it up.
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.output())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// A default exception filter that renders interceptor-chain errors
#[derive(Default)]
pub struct HttpExceptionFilter;

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, error: Box<dyn Error + Send + Sync>) -> Response {
        match error.downcast::<HttpException>() {
            Ok(exception) => (*exception).into_response(),
            Err(error) => {
                tracing::error!(error = %error, "unhandled interceptor error");
                HttpException::internal(error.to_string()).into_response()
            }
        }
    }
}
