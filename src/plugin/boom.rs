use crate::exception::HttpException;
use crate::plugin::Boombox;
use axum::response::{IntoResponse, Response};

/// Options for [`Boombox::boom`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoomOptions {
    /// Hand the error back instead of a ready response.
    pub return_error: bool,
    /// Replace the error with its catalog entry when there is one.
    pub convert: bool,
}

impl BoomOptions {
    pub fn convert() -> Self {
        Self {
            convert: true,
            ..Self::default()
        }
    }

    pub fn return_error(mut self) -> Self {
        self.return_error = true;
        self
    }
}

pub enum Boomed {
    Error(HttpException),
    Reply(Response),
}

impl Boomed {
    pub fn into_error(self) -> Option<HttpException> {
        match self {
            Self::Error(error) => Some(error),
            Self::Reply(_) => None,
        }
    }
}

impl IntoResponse for Boomed {
    fn into_response(self) -> Response {
        match self {
            Self::Error(error) => error.into_response(),
            Self::Reply(response) => response,
        }
    }
}

impl Boombox {
    /// Imperative remap for handlers that want to answer with a catalog error
    /// directly.
    ///
    /// With `convert`, any error whose message is in the catalog is replaced,
    /// whatever its status. Without it the error is used as given.
    pub fn boom(&self, error: HttpException, options: BoomOptions) -> Boomed {
        let error = if options.convert {
            match self.catalog().get(error.message()) {
                Some(entry) => error.substitute(entry.kind, entry.message.clone()),
                None => error,
            }
        } else {
            error
        };

        if options.return_error {
            Boomed::Error(error)
        } else {
            Boomed::Reply(error.into_response())
        }
    }
}
