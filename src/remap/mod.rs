//! Applying the catalog to an error.

use crate::catalog::{CatalogEntry, ErrorCatalog};
use crate::exception::HttpException;
use crate::route::RouteSettings;
use std::fmt::Display;

/// Outcome of the pre-response hook.
#[derive(Debug, Clone)]
pub enum PreResponse {
    /// Send the pending response as it is.
    Continue,
    /// Replace the pending response with this error.
    Replace(HttpException),
}

impl PreResponse {
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// Pure lookup-and-substitute over a read-only [`ErrorCatalog`].
#[derive(Debug, Clone, Default)]
pub struct ErrorRemapper {
    catalog: ErrorCatalog,
}

impl ErrorRemapper {
    pub fn new(catalog: ErrorCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ErrorCatalog {
        &self.catalog
    }

    pub fn find<E: Display + ?Sized>(&self, error: Option<&E>) -> Option<&CatalogEntry> {
        self.catalog.find(error)
    }

    /// Decides what to send instead of `error`.
    ///
    /// Client errors, exempt routes and errors that are already substitutes
    /// are never looked up.
    pub fn remap(&self, error: &HttpException, settings: Option<&RouteSettings>) -> PreResponse {
        if !error.is_server() || error.is_substituted() {
            return PreResponse::Continue;
        }

        if settings.is_some_and(|s| s.disable) {
            return PreResponse::Continue;
        }

        match self.catalog.get(error.message()) {
            Some(entry) => {
                PreResponse::Replace(error.substitute(entry.kind, entry.message.clone()))
            }
            None => PreResponse::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ErrorKind;

    fn remapper() -> ErrorRemapper {
        ErrorRemapper::new(
            [
                ("ERROR_KEY_1", CatalogEntry::new(ErrorKind::MethodNotAllowed, "Error one")),
                ("NOT_FOUND_KEY", CatalogEntry::new(ErrorKind::NotFound, "Missing")),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_matched_server_error_is_replaced() {
        let PreResponse::Replace(replaced) =
            remapper().remap(&HttpException::internal("ERROR_KEY_1"), None)
        else {
            panic!("expected a replacement");
        };

        assert!(replaced.is_substituted());
        assert_eq!(replaced.status().as_u16(), 405);
        assert_eq!(replaced.message(), "Error one");
        assert_eq!(replaced.output().error, "Method Not Allowed");
    }

    #[test]
    fn test_unmatched_server_error_passes_through() {
        let outcome = remapper().remap(&HttpException::internal("Unlisted"), None);
        assert!(outcome.is_continue());
    }

    #[test]
    fn test_client_error_is_never_looked_up() {
        let outcome = remapper().remap(&HttpException::bad_request("ERROR_KEY_1"), None);
        assert!(outcome.is_continue());
    }

    #[test]
    fn test_exempt_route_passes_through() {
        let err = HttpException::internal("ERROR_KEY_1");
        let remapper = remapper();

        assert!(remapper.remap(&err, Some(&RouteSettings { disable: true })).is_continue());
        assert!(!remapper.remap(&err, Some(&RouteSettings { disable: false })).is_continue());
    }

    #[test]
    fn test_substitute_is_not_remapped_again() {
        let remapper = ErrorRemapper::new(
            [
                ("FIRST", CatalogEntry::new(ErrorKind::ServerUnavailable, "SECOND")),
                ("SECOND", CatalogEntry::new(ErrorKind::NotFound, "third")),
            ]
            .into_iter()
            .collect(),
        );

        let PreResponse::Replace(first) = remapper.remap(&HttpException::internal("FIRST"), None)
        else {
            panic!("expected a replacement");
        };
        assert_eq!(first.status().as_u16(), 503);
        assert!(remapper.remap(&first, None).is_continue());
    }

    #[test]
    fn test_empty_catalog_is_a_no_op() {
        let outcome = ErrorRemapper::default().remap(&HttpException::internal("ERROR_KEY_1"), None);
        assert!(outcome.is_continue());
    }
}
