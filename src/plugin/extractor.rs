use crate::plugin::Boombox;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode as HttpStatusCode, request::Parts},
};

/// Axum extractor for the request-scoped boombox
///
/// Resolves the instance the interceptor attached to the request, so a
/// handler can inspect the catalog without going through the remap pipeline.
///
/// # Example
/// ```
/// use axum::Json;
/// use boombox::{BoomboxLookup, CatalogEntry, HttpException};
///
/// async fn inspect(boombox: BoomboxLookup) -> Json<Option<CatalogEntry>> {
///     let error = HttpException::internal("ERROR_KEY_1");
///     Json(boombox.find(Some(&error)).cloned())
/// }
/// ```
#[derive(Clone)]
pub struct BoomboxLookup(pub Boombox);

impl<S> FromRequestParts<S> for BoomboxLookup
where
    S: Send + Sync,
{
    type Rejection = (HttpStatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Boombox>()
            .cloned()
            .map(BoomboxLookup)
            .ok_or_else(|| {
                (
                    HttpStatusCode::INTERNAL_SERVER_ERROR,
                    "Boombox interceptor is not installed".to_string(),
                )
            })
    }
}

/// Deref implementation for convenient access to the boombox
impl std::ops::Deref for BoomboxLookup {
    type Target = Boombox;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
