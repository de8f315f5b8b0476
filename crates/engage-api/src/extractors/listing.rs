//! Listing query extractor
//!
//! Extracts sort, brand filter and page parameters from the query string.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use engage_service::dto::ProductListRequest;
use engage_service::services::ListingQuery;
use validator::Validate;

use crate::response::ApiError;

/// Validated listing parameters
#[derive(Debug, Clone, Copy)]
pub struct Listing(pub ListingQuery);

impl TryFrom<ProductListRequest> for Listing {
    type Error = ApiError;

    fn try_from(request: ProductListRequest) -> Result<Self, Self::Error> {
        request.validate()?;
        Ok(Listing(request.to_query()?))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Listing
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(request) = Query::<ProductListRequest>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_query(e.to_string()))?;

        Listing::try_from(request)
    }
}
