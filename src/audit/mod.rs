//! Best-effort audit records for remapped responses.
//!
//! A record is built only when the final response carries a substituted
//! [`HttpException`] and its status is not `400`. Payload passwords and
//! everything but the credential id are stripped. Records are built and
//! emitted off the response path, and nothing that goes wrong here reaches the
//! client.

mod record;
mod sink;

pub use record::{
    AuditRecord, CredentialsRecord, REDACTED_PAYLOAD_FIELD, RequestInfo, RequestRecord,
    RequestSnapshot, ResponseSummary, redact_payload,
};
pub use sink::{AUDIT_TAGS, AuditError, AuditSink, ChannelSink, TracingSink};

use crate::exception::HttpException;
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Authenticated caller, as inserted into request or response extensions by
/// an auth layer. Only `id` ever makes it into an audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub id: Value,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl Credentials {
    pub fn new(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            claims: Map::new(),
        }
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }
}

/// Marks a response whose record has already been emitted.
#[derive(Debug, Clone, Copy)]
pub struct Audited;

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl AuditLogger {
    pub fn new(sink: impl AuditSink) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// The exception a record should be built for, if any.
    pub fn auditable(response: &Response) -> Option<&HttpException> {
        if response.status() == StatusCode::BAD_REQUEST
            || response.extensions().get::<Audited>().is_some()
        {
            return None;
        }

        response
            .extensions()
            .get::<HttpException>()
            .filter(|e| e.is_substituted())
    }

    /// Marks `response` as audited and hands its record to the sink, at most
    /// once.
    ///
    /// Inside a tokio runtime the record is built and emitted on the blocking
    /// pool, so a slow sink never holds the response back. Outside one it is
    /// emitted inline.
    pub fn log(&self, snapshot: &RequestSnapshot, response: &mut Response) {
        let Some(exception) = Self::auditable(response).cloned() else {
            return;
        };

        let mut snapshot = snapshot.clone();
        if snapshot.credentials.is_none() {
            snapshot.credentials = response.extensions().get::<Credentials>().cloned();
        }
        let summary = ResponseSummary::now(response.status(), snapshot.started);
        response.extensions_mut().insert(Audited);

        let logger = self.clone();
        let job = move || logger.emit(AuditRecord::build(&exception, &snapshot, &summary));
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }

    fn emit(&self, record: AuditRecord) {
        let request_id = record.request.id.clone();
        match catch_unwind(AssertUnwindSafe(|| self.sink.emit(record))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(request_id = %request_id, error = %e, "dropped audit record");
            }
            Err(_) => {
                tracing::debug!(request_id = %request_id, "audit sink panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ErrorKind;
    use axum::http::{HeaderMap, Method};
    use axum::response::IntoResponse;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn snapshot() -> RequestSnapshot {
        RequestSnapshot::new(Method::GET, "/error".parse().unwrap(), HeaderMap::new())
    }

    fn substituted(kind: ErrorKind) -> Response {
        HttpException::internal("ERROR_KEY_1")
            .substitute(kind, "Error one")
            .into_response()
    }

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn emit(&self, _record: AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Closed)
        }
    }

    struct PanickingSink;

    impl AuditSink for PanickingSink {
        fn emit(&self, _record: AuditRecord) -> Result<(), AuditError> {
            panic!("sink exploded")
        }
    }

    #[test]
    fn test_logs_substituted_error_once() {
        let (sink, mut rx) = ChannelSink::new();
        let logger = AuditLogger::new(sink);
        let mut response = substituted(ErrorKind::MethodNotAllowed);

        logger.log(&snapshot(), &mut response);
        logger.log(&snapshot(), &mut response);

        let record = rx.try_recv().unwrap();
        assert_eq!(record.error.status_code, 405);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_skips_organic_errors() {
        let (sink, mut rx) = ChannelSink::new();
        let logger = AuditLogger::new(sink);
        let mut response = HttpException::internal("Unlisted").into_response();

        logger.log(&snapshot(), &mut response);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_skips_status_400() {
        let (sink, mut rx) = ChannelSink::new();
        let logger = AuditLogger::new(sink);
        let mut response = substituted(ErrorKind::BadRequest);

        logger.log(&snapshot(), &mut response);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_credentials_from_response_extensions() {
        let (sink, mut rx) = ChannelSink::new();
        let logger = AuditLogger::new(sink);
        let mut response = substituted(ErrorKind::MethodNotAllowed);
        response
            .extensions_mut()
            .insert(Credentials::new(1).with_claim("name", "John Doe"));

        logger.log(&snapshot(), &mut response);

        let record = rx.try_recv().unwrap();
        assert_eq!(record.request.credentials, Some(CredentialsRecord { id: json!(1) }));
    }

    #[test]
    fn test_sink_failures_are_swallowed() {
        let mut response = substituted(ErrorKind::MethodNotAllowed);
        AuditLogger::new(FailingSink).log(&snapshot(), &mut response);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let mut response = substituted(ErrorKind::MethodNotAllowed);
        AuditLogger::new(PanickingSink).log(&snapshot(), &mut response);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    struct SlowSink(ChannelSink);

    impl AuditSink for SlowSink {
        fn emit(&self, record: AuditRecord) -> Result<(), AuditError> {
            std::thread::sleep(Duration::from_millis(300));
            self.0.emit(record)
        }
    }

    #[tokio::test]
    async fn test_slow_sink_does_not_hold_the_response() {
        let (sink, mut rx) = ChannelSink::new();
        let logger = AuditLogger::new(SlowSink(sink));
        let mut response = substituted(ErrorKind::MethodNotAllowed);

        let started = Instant::now();
        logger.log(&snapshot(), &mut response);
        assert!(started.elapsed() < Duration::from_millis(200));
        assert!(response.extensions().get::<Audited>().is_some());

        let record = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.request.status_code, 405);
    }

    #[tokio::test]
    async fn test_response_time_is_taken_at_handoff() {
        let (sink, mut rx) = ChannelSink::new();
        let logger = AuditLogger::new(SlowSink(sink));
        let mut response = substituted(ErrorKind::MethodNotAllowed);

        logger.log(&snapshot(), &mut response);

        let record = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(record.request.response_time < 300);
    }

    #[test]
    fn test_credentials_flatten_claims() {
        let credentials: Credentials =
            serde_json::from_value(json!({ "id": 1, "name": "John Doe" })).unwrap();
        assert_eq!(credentials.id, json!(1));
        assert_eq!(credentials.claims.get("name"), Some(&json!("John Doe")));
    }
}
