//! In-memory implementation of CatalogStore

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;

use engage_core::entities::{Brand, CatalogProduct};
use engage_core::error::DomainError;
use engage_core::traits::{CatalogStore, RepoResult};
use engage_core::value_objects::{BrandId, ProductId};

/// Brands generated by [`MemoryCatalog::seeded`]
const SEED_BRANDS: i64 = 10;

/// Catalog held in memory, seeded at startup or by tests
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: DashMap<ProductId, CatalogProduct>,
    brands: DashMap<BrandId, Brand>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate `products` demo products spread over a fixed set of brands
    pub fn seeded(products: usize) -> Result<Self, DomainError> {
        let catalog = Self::new();
        for b in 1..=SEED_BRANDS {
            catalog.upsert_brand(Brand {
                id: BrandId::new(b)?,
                name: format!("Brand {b}"),
            });
        }

        let released = Utc::now();
        for i in 1..=products as i64 {
            catalog.upsert_product(CatalogProduct::new(
                ProductId::new(i)?,
                format!("Product {i}"),
                BrandId::new((i - 1) % SEED_BRANDS + 1)?,
                1_000 + (i * 7_919 % 100) * 100,
                released - Duration::minutes(i),
            )?);
        }
        Ok(catalog)
    }

    pub fn upsert_product(&self, product: CatalogProduct) {
        self.products.insert(product.id, product);
    }

    pub fn upsert_brand(&self, brand: Brand) {
        self.brands.insert(brand.id, brand);
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn all_products(&self) -> RepoResult<Vec<CatalogProduct>> {
        Ok(self
            .products
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_product(&self, product_id: ProductId) -> RepoResult<Option<CatalogProduct>> {
        Ok(self.products.get(&product_id).map(|entry| entry.clone()))
    }

    async fn brands(&self, ids: &[BrandId]) -> RepoResult<Vec<Brand>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.brands.get(id).map(|entry| entry.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_catalog() {
        let catalog = MemoryCatalog::seeded(25).unwrap();
        assert_eq!(catalog.product_count(), 25);

        let product = catalog
            .find_product(ProductId::new(12).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.brand_id.into_inner(), 2);
        assert!(product.price >= 1_000);

        let brands = catalog
            .brands(&[BrandId::new(2).unwrap(), BrandId::new(99).unwrap()])
            .await
            .unwrap();
        assert_eq!(brands.len(), 1);
        assert_eq!(brands[0].name, "Brand 2");
    }

    #[tokio::test]
    async fn test_missing_product() {
        let catalog = MemoryCatalog::new();
        assert!(catalog
            .find_product(ProductId::new(1).unwrap())
            .await
            .unwrap()
            .is_none());
    }
}
