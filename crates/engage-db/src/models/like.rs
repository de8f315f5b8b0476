//! Like database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for product_likes table
#[derive(Debug, Clone, FromRow)]
pub struct LikeModel {
    pub user_id: i64,
    pub product_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Database model for like_summary table
#[derive(Debug, Clone, FromRow)]
pub struct LikeSummaryModel {
    pub product_id: i64,
    pub like_count: i64,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Row returned by a counter delta
#[derive(Debug, Clone, FromRow)]
pub struct LikeSummaryDeltaModel {
    pub product_id: i64,
    pub like_count: i64,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub clamped: bool,
}

/// Aggregated active likes per product (from query)
#[derive(Debug, Clone, FromRow)]
pub struct ProductLikeCountModel {
    pub product_id: i64,
    pub count: i64,
}
