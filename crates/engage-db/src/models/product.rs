//! Catalog database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for products table
#[derive(Debug, Clone, FromRow)]
pub struct ProductModel {
    pub id: i64,
    pub name: String,
    pub brand_id: i64,
    pub price: i64,
    pub released_at: DateTime<Utc>,
}

/// Database model for brands table
#[derive(Debug, Clone, FromRow)]
pub struct BrandModel {
    pub id: i64,
    pub name: String,
}
