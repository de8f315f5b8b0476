//! Service result to DTO mappers
//!
//! Implements `From` conversions from service results to response DTOs.

use crate::services::{
    LikeCountView, LikeResult, LikedProduct, ListedProduct, ListingPage, ProductDetail,
};

use super::responses::{
    LikeCountResponse, LikeResponse, LikedProductResponse, ProductDetailResponse,
    ProductPageResponse, ProductSummaryResponse,
};

// ============================================================================
// Like Mappers
// ============================================================================

impl From<&LikeResult> for LikeResponse {
    fn from(result: &LikeResult) -> Self {
        Self {
            product_id: result.product_id,
            state: result.state,
            noop: result.noop,
            like_count: result.like_count,
            count_pending: result.count_pending,
        }
    }
}

impl From<LikeResult> for LikeResponse {
    fn from(result: LikeResult) -> Self {
        Self::from(&result)
    }
}

impl From<LikeCountView> for LikeCountResponse {
    fn from(view: LikeCountView) -> Self {
        Self {
            product_id: view.product_id,
            like_count: view.like_count,
            stale: view.stale,
        }
    }
}

impl From<LikedProduct> for LikedProductResponse {
    fn from(liked: LikedProduct) -> Self {
        Self {
            product: ProductSummaryResponse::from(liked.product),
            liked_at: liked.liked_at,
        }
    }
}

// ============================================================================
// Product Mappers
// ============================================================================

impl From<ListedProduct> for ProductSummaryResponse {
    fn from(listed: ListedProduct) -> Self {
        let entry = listed.entry;
        Self {
            id: entry.product_id,
            name: entry.name,
            brand_id: entry.brand_id,
            brand_name: listed.brand_name,
            price: entry.price,
            like_count: entry.like_count,
            released_at: entry.created_at,
        }
    }
}

impl From<ProductDetail> for ProductDetailResponse {
    fn from(detail: ProductDetail) -> Self {
        Self {
            product: ProductSummaryResponse::from(detail.product),
            stale: detail.stale,
            degraded: detail.degraded,
        }
    }
}

impl From<ListingPage> for ProductPageResponse {
    fn from(page: ListingPage) -> Self {
        let has_more = (page.page + 1).saturating_mul(page.size) < page.total;
        Self {
            items: page.items.into_iter().map(ProductSummaryResponse::from).collect(),
            page: page.page,
            size: page.size,
            total: page.total,
            has_more,
            stale: page.stale,
            degraded: page.degraded,
        }
    }
}
