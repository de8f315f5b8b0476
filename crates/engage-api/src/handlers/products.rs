//! Product handlers
//!
//! Endpoints for ranked product listings, product details and per-product
//! like counts.

use axum::{extract::State, Json};
use engage_service::dto::{
    ApiResponse, LikeCountResponse, ProductDetailResponse, ProductPageResponse,
};

use crate::extractors::{Listing, ProductPath};
use crate::response::ApiResult;
use crate::state::AppState;

/// One page of products in the requested order
///
/// GET /products?sort=&brandId=&page=&size=
pub async fn list_products(
    State(state): State<AppState>,
    Listing(query): Listing,
) -> ApiResult<Json<ApiResponse<ProductPageResponse>>> {
    let page = state.engagement().list_products(query).await?;

    Ok(Json(ApiResponse::new(ProductPageResponse::from(page))))
}

/// One product with its brand and like count
///
/// GET /products/:product_id
pub async fn get_product(
    State(state): State<AppState>,
    ProductPath(product_id): ProductPath,
) -> ApiResult<Json<ApiResponse<ProductDetailResponse>>> {
    let detail = state.engagement().product_detail(product_id).await?;

    Ok(Json(ApiResponse::new(ProductDetailResponse::from(detail))))
}

/// Like count of a product
///
/// GET /products/:product_id/likes
pub async fn get_like_count(
    State(state): State<AppState>,
    ProductPath(product_id): ProductPath,
) -> ApiResult<Json<ApiResponse<LikeCountResponse>>> {
    let view = state.engagement().like_count(product_id).await?;

    Ok(Json(ApiResponse::new(LikeCountResponse::from(view))))
}
