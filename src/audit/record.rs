use crate::audit::Credentials;
use crate::exception::{ExceptionOutput, HttpException};
use axum::extract::Query;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The payload field removed before a record is emitted.
pub const REDACTED_PAYLOAD_FIELD: &str = "password";

/// What the interceptor captured about a request on the way in.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub id: Uuid,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub payload: Option<Value>,
    pub credentials: Option<Credentials>,
    pub received: DateTime<Utc>,
    pub started: Instant,
}

impl RequestSnapshot {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            uri,
            headers,
            payload: None,
            credentials: None,
            received: Utc::now(),
            started: Instant::now(),
        }
    }
}

/// How the response ended, taken when it is handed back to the client.
#[derive(Debug, Clone, Copy)]
pub struct ResponseSummary {
    pub status: StatusCode,
    pub responded: DateTime<Utc>,
    pub elapsed: Duration,
}

impl ResponseSummary {
    pub fn now(status: StatusCode, started: Instant) -> Self {
        Self {
            status,
            responded: Utc::now(),
            elapsed: started.elapsed(),
        }
    }
}

/// One structured record per remapped response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub error: ExceptionOutput,
    /// The original error message that matched the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub stack: String,
    pub request: RequestRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub id: String,
    pub instance: String,
    pub path: String,
    /// Repeated keys collect into an array.
    pub query: BTreeMap<String, Value>,
    pub status_code: u16,
    pub method: String,
    pub payload: Option<Value>,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialsRecord>,
    /// Milliseconds between receiving the request and finishing the response.
    pub response_time: u64,
    pub info: RequestInfo,
}

/// Only the caller's identifier, never the full credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialsRecord {
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestInfo {
    pub received: DateTime<Utc>,
    pub responded: DateTime<Utc>,
}

impl AuditRecord {
    pub fn build(
        exception: &HttpException,
        snapshot: &RequestSnapshot,
        summary: &ResponseSummary,
    ) -> Self {
        let path = snapshot
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| snapshot.uri.path().to_string());

        Self {
            error: exception.output(),
            key: exception.catalog_key().map(str::to_string),
            stack: exception.stack(),
            request: RequestRecord {
                id: snapshot.id.to_string(),
                instance: snapshot.uri.to_string(),
                path,
                query: query_map(&snapshot.uri),
                status_code: summary.status.as_u16(),
                method: snapshot.method.to_string(),
                payload: snapshot.payload.clone().map(redact_payload),
                headers: header_map(&snapshot.headers),
                credentials: snapshot.credentials.as_ref().map(|c| CredentialsRecord {
                    id: c.id.clone(),
                }),
                response_time: summary.elapsed.as_millis() as u64,
                info: RequestInfo {
                    received: snapshot.received,
                    responded: summary.responded,
                },
            },
        }
    }
}

/// Drops a top-level `password` field. Nested objects are left alone.
pub fn redact_payload(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.remove(REDACTED_PAYLOAD_FIELD);
            Value::Object(map)
        }
        other => other,
    }
}

fn query_map(uri: &Uri) -> BTreeMap<String, Value> {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();

    let mut map = BTreeMap::new();
    for (name, value) in pairs {
        match map.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(Value::String(value));
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(values) => values.push(Value::String(value)),
                first => *first = Value::Array(vec![first.take(), Value::String(value)]),
            },
        }
    }
    map
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}
