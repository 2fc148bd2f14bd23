use crate::catalog::ErrorCatalog;
use crate::error::{BoomboxError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::env;
use std::path::Path;

/// Path to a full options file (`{ "errors": ..., "disableLog": ... }`).
pub const CONFIG_PATH_VAR: &str = "BOOMBOX_CONFIG";
/// Path to a bare catalog file (`{ "KEY": { "type": ..., "message": ... } }`).
pub const ERRORS_PATH_VAR: &str = "BOOMBOX_ERRORS";
pub const DISABLE_LOG_VAR: &str = "BOOMBOX_DISABLE_LOG";

pub const DEFAULT_PAYLOAD_LIMIT: usize = 1024 * 1024;

/// Options a [`Boombox`](crate::Boombox) is built from.
///
/// Deserializes from camelCase JSON. Every field is optional, `null` means
/// the default and keys this crate does not know are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoomboxOptions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: ErrorCatalog,

    #[serde(default, deserialize_with = "null_as_default")]
    pub disable_log: bool,

    /// Largest request body, in bytes, captured into audit records.
    #[serde(
        default = "default_payload_limit",
        deserialize_with = "null_as_default_payload_limit"
    )]
    pub payload_limit: usize,
}

impl Default for BoomboxOptions {
    fn default() -> Self {
        Self {
            errors: ErrorCatalog::default(),
            disable_log: false,
            payload_limit: DEFAULT_PAYLOAD_LIMIT,
        }
    }
}

fn default_payload_limit() -> usize {
    DEFAULT_PAYLOAD_LIMIT
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_payload_limit<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or(DEFAULT_PAYLOAD_LIMIT))
}

impl BoomboxOptions {
    pub fn new(errors: ErrorCatalog) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    pub fn disable_log(mut self, disable: bool) -> Self {
        self.disable_log = disable;
        self
    }

    pub fn payload_limit(mut self, limit: usize) -> Self {
        self.payload_limit = limit;
        self
    }

    pub fn from_value(value: Value) -> Result<Self> {
        // Validate the catalog first so a malformed one reports as such.
        if let Some(errors) = value.get("errors").filter(|errors| !errors.is_null()) {
            ErrorCatalog::from_value(errors.clone())?;
        }
        serde_json::from_value(value).map_err(|e| BoomboxError::invalid_options(e.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| BoomboxError::invalid_options(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Loads options from the environment.
    ///
    /// `BOOMBOX_CONFIG` names an options file and `BOOMBOX_ERRORS` a bare
    /// catalog file that replaces its `errors`. `BOOMBOX_DISABLE_LOG`
    /// overrides `disableLog`. Unset variables fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut options = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_path(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(path) = env::var(ERRORS_PATH_VAR) {
            options.errors = ErrorCatalog::from_json_str(&read(Path::new(&path))?)?;
        }

        if let Ok(raw) = env::var(DISABLE_LOG_VAR) {
            options.disable_log = parse_bool(&raw).ok_or_else(|| BoomboxError::Env {
                name: DISABLE_LOG_VAR.to_string(),
                message: format!("expected a boolean, found {raw:?}"),
            })?;
        }

        Ok(options)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| BoomboxError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
