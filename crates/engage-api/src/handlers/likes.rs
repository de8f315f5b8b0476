//! Like handlers
//!
//! Endpoints for liking, unliking and toggling products, and for listing the
//! caller's liked products.

use axum::{extract::State, Json};
use engage_service::dto::{ApiResponse, LikeResponse, LikedProductResponse};

use crate::extractors::{CallerId, ProductPath};
use crate::response::ApiResult;
use crate::state::AppState;

/// Toggle the caller's like on a product
///
/// POST /like/products/:product_id
pub async fn toggle_like(
    State(state): State<AppState>,
    caller: CallerId,
    ProductPath(product_id): ProductPath,
) -> ApiResult<Json<ApiResponse<LikeResponse>>> {
    let result = state
        .engagement()
        .toggle_like(caller.user_id, product_id)
        .await?;

    Ok(Json(ApiResponse::new(LikeResponse::from(result))))
}

/// Like a product; repeating the call changes nothing
///
/// PUT /like/products/:product_id
pub async fn like_product(
    State(state): State<AppState>,
    caller: CallerId,
    ProductPath(product_id): ProductPath,
) -> ApiResult<Json<ApiResponse<LikeResponse>>> {
    let result = state.engagement().like(caller.user_id, product_id).await?;

    Ok(Json(ApiResponse::new(LikeResponse::from(result))))
}

/// Remove the caller's like; repeating the call changes nothing
///
/// DELETE /like/products/:product_id
pub async fn unlike_product(
    State(state): State<AppState>,
    caller: CallerId,
    ProductPath(product_id): ProductPath,
) -> ApiResult<Json<ApiResponse<LikeResponse>>> {
    let result = state
        .engagement()
        .unlike(caller.user_id, product_id)
        .await?;

    Ok(Json(ApiResponse::new(LikeResponse::from(result))))
}

/// Products the caller likes, most recent first
///
/// GET /like/products
pub async fn get_liked_products(
    State(state): State<AppState>,
    caller: CallerId,
) -> ApiResult<Json<ApiResponse<Vec<LikedProductResponse>>>> {
    let liked = state.engagement().liked_products(caller.user_id).await?;

    let response: Vec<LikedProductResponse> =
        liked.into_iter().map(LikedProductResponse::from).collect();

    Ok(Json(ApiResponse::new(response)))
}
