//! The error catalog: message key -> replacement error.

use crate::error::{BoomboxError, Result};
use crate::exception::ErrorKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

/// A single replacement: which kind of HTTP error to answer with, and the
/// message the client gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

impl CatalogEntry {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Immutable map of error message to [`CatalogEntry`].
///
/// Cloning shares the underlying map. Nothing mutates it after construction,
/// so concurrent lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct ErrorCatalog {
    entries: Arc<HashMap<String, CatalogEntry>>,
}

impl ErrorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog from a JSON object of `{ key: { type, message } }`.
    ///
    /// Anything but an object is rejected, as is an entry naming an unknown
    /// error kind.
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(BoomboxError::invalid_catalog(format!(
                    "expected a map of error keys, found {}",
                    json_type_name(&other)
                )));
            }
        };

        let mut entries = HashMap::with_capacity(map.len());
        for (key, raw) in map {
            if let Some(kind) = raw.get("type").and_then(Value::as_str) {
                if kind.parse::<ErrorKind>().is_err() {
                    return Err(BoomboxError::UnknownErrorKind {
                        kind: kind.to_string(),
                    });
                }
            }
            let entry: CatalogEntry = serde_json::from_value(raw).map_err(|e| {
                BoomboxError::invalid_catalog(format!("entry {key:?}: {e}"))
            })?;
            entries.insert(key, entry);
        }

        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| BoomboxError::invalid_catalog(e.to_string()))?;
        Self::from_value(value)
    }

    /// Raw lookup by key.
    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    /// Looks up an error by its message. `None` in, `None` out.
    pub fn find<E: Display + ?Sized>(&self, error: Option<&E>) -> Option<&CatalogEntry> {
        error.and_then(|e| self.get(&e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Later duplicates replace earlier ones.
impl<K: Into<String>> FromIterator<(K, CatalogEntry)> for ErrorCatalog {
    fn from_iter<I: IntoIterator<Item = (K, CatalogEntry)>>(iter: I) -> Self {
        let entries = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl<'de> Deserialize<'de> for ErrorCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::HttpException;
    use serde_json::json;

    fn catalog() -> ErrorCatalog {
        ErrorCatalog::from_value(json!({
            "ERROR_KEY_1": { "type": "methodNotAllowed", "message": "Error one" },
            "ERROR_KEY_400": { "type": "teapot", "message": "I'm a teapot" }
        }))
        .unwrap()
    }

    #[test]
    fn test_find_matched_and_unmatched() {
        let catalog = catalog();

        let matched = catalog.find(Some(&HttpException::internal("ERROR_KEY_1")));
        assert_eq!(
            matched,
            Some(&CatalogEntry::new(ErrorKind::MethodNotAllowed, "Error one"))
        );

        assert!(catalog.find(Some(&HttpException::internal("ERROR_KEY_2"))).is_none());
    }

    #[test]
    fn test_find_none_is_absent() {
        assert!(catalog().find::<HttpException>(None).is_none());
    }

    #[test]
    fn test_find_is_idempotent() {
        let catalog = catalog();
        let err = HttpException::internal("ERROR_KEY_1");
        let first = catalog.find(Some(&err)).cloned();
        let second = catalog.find(Some(&err)).cloned();
        assert_eq!(first, second);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_entry_serializes_with_type_field() {
        let entry = catalog().get("ERROR_KEY_1").cloned().unwrap();
        assert_eq!(
            serde_json::to_value(entry).unwrap(),
            json!({ "type": "methodNotAllowed", "message": "Error one" })
        );
    }

    #[test]
    fn test_non_map_is_rejected() {
        let err = ErrorCatalog::from_value(json!(["ERROR_KEY_1"])).unwrap_err();
        assert!(matches!(err, BoomboxError::InvalidCatalog { .. }));

        let err = ErrorCatalog::from_json_str("\"errors\"").unwrap_err();
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = ErrorCatalog::from_value(json!({
            "KEY": { "type": "notARealKind", "message": "x" }
        }))
        .unwrap_err();
        assert!(matches!(err, BoomboxError::UnknownErrorKind { kind } if kind == "notARealKind"));
    }

    #[test]
    fn test_missing_message_is_rejected() {
        let err = ErrorCatalog::from_value(json!({ "KEY": { "type": "notFound" } })).unwrap_err();
        assert!(matches!(err, BoomboxError::InvalidCatalog { .. }));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let catalog: ErrorCatalog = vec![
            ("KEY", CatalogEntry::new(ErrorKind::NotFound, "first")),
            ("KEY", CatalogEntry::new(ErrorKind::Conflict, "second")),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("KEY").unwrap().message, "second");
    }
}
