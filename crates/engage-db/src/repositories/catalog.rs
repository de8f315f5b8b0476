//! PostgreSQL implementation of CatalogStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{Brand, CatalogProduct};
use engage_core::traits::{CatalogStore, RepoResult};
use engage_core::value_objects::{BrandId, ProductId};

use crate::models::{BrandModel, ProductModel};

use super::error::map_db_error;

/// PostgreSQL implementation of CatalogStore (read-only)
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a new PgCatalogStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(skip(self))]
    async fn all_products(&self) -> RepoResult<Vec<CatalogProduct>> {
        let rows = sqlx::query_as::<_, ProductModel>(
            r#"
            SELECT id, name, brand_id, price, released_at
            FROM products
            WHERE deleted_at IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(CatalogProduct::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn find_product(&self, product_id: ProductId) -> RepoResult<Option<CatalogProduct>> {
        let row = sqlx::query_as::<_, ProductModel>(
            r#"
            SELECT id, name, brand_id, price, released_at
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(product_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(CatalogProduct::try_from).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn brands(&self, ids: &[BrandId]) -> RepoResult<Vec<Brand>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, BrandModel>(
            r#"
            SELECT id, name FROM brands WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Brand::try_from).collect()
    }
}
