//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for API inputs
//! - Response DTOs for serializing API outputs
//! - Mappers for converting service results to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{ProductListRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub use responses::{
    ApiResponse, HealthResponse, LikeCountResponse, LikeResponse, LikedProductResponse,
    ProductDetailResponse, ProductPageResponse, ProductSummaryResponse, ReadinessResponse,
};
