//! Path parameter extractors
//!
//! Type-safe extraction of identifiers from path parameters.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use engage_core::ProductId;

use crate::response::ApiError;

/// Product id taken from the `:product_id` path segment
#[derive(Debug, Clone, Copy)]
pub struct ProductPath(pub ProductId);

#[async_trait]
impl<S> FromRequestParts<S> for ProductPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        let product_id = ProductId::parse(&raw)
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        Ok(ProductPath(product_id))
    }
}
