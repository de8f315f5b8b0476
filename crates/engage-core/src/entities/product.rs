//! Catalog-facing entities and the ranking projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::LikeCount;
use crate::error::DomainError;
use crate::value_objects::{BrandId, ProductId};

/// Product as published by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub brand_id: BrandId,
    pub price: i64,
    /// Release time, used for recency ordering
    pub created_at: DateTime<Utc>,
}

impl CatalogProduct {
    /// Create a product, validating the price
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        brand_id: BrandId,
        price: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if price < 0 {
            return Err(DomainError::ValidationError(format!(
                "price must not be negative: {price}"
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            brand_id,
            price,
            created_at,
        })
    }
}

/// Brand as published by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// Denormalized projection used for ordering and filtering
///
/// Never authoritative: the like count is copied from the counter store and
/// the remaining attributes from the catalog at the last rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub product_id: ProductId,
    pub name: String,
    pub brand_id: BrandId,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    /// Counter version the like count was copied from
    pub version: u64,
}

impl RankingEntry {
    /// Project a catalog product and its counter into a ranking entry
    pub fn project(product: &CatalogProduct, count: Option<&LikeCount>) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            brand_id: product.brand_id,
            price: product.price,
            created_at: product.created_at,
            like_count: count.map_or(0, |c| c.count),
            version: count.map_or(0, |c| c.version),
        }
    }
}
