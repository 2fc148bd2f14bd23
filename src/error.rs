use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoomboxError>;

/// Errors raised while building a [`Boombox`](crate::Boombox).
///
/// These are the only fatal errors in the crate. Everything that happens per
/// request degrades to pass-through instead.
#[derive(Debug, Error)]
pub enum BoomboxError {
    #[error("Invalid error catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("Unknown error kind: {kind}")]
    UnknownErrorKind { kind: String },

    #[error("Invalid boombox options: {message}")]
    InvalidOptions { message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid environment variable {name}: {message}")]
    Env { name: String, message: String },
}

impl BoomboxError {
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }
}
