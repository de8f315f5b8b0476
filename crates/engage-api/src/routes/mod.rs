//! Route definitions
//!
//! All API routes organized by domain and mounted under /api/v1.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, likes, products};
use crate::state::AppState;

/// Create the main API router with all routes (excluding health for separate middleware handling)
pub fn create_router() -> Router<AppState> {
    Router::new()
        // API v1 endpoints
        .nest("/api/v1", api_v1_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new().merge(like_routes()).merge(product_routes())
}

/// Like routes, all keyed by the caller identity header
fn like_routes() -> Router<AppState> {
    Router::new()
        .route("/like/products", get(likes::get_liked_products))
        .route(
            "/like/products/:product_id",
            post(likes::toggle_like)
                .put(likes::like_product)
                .delete(likes::unlike_product),
        )
}

/// Product listing routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list_products))
        .route("/products/:product_id", get(products::get_product))
        .route("/products/:product_id/likes", get(products::get_like_count))
}
