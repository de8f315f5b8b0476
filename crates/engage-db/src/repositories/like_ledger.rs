//! PostgreSQL implementation of LikeLedgerStore

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::instrument;

use engage_core::entities::LikeRecord;
use engage_core::traits::{LikeLedgerStore, RepoResult};
use engage_core::value_objects::{ProductId, UserId};

use crate::mappers::{corrupt_row, to_u64};
use crate::models::{LikeModel, ProductLikeCountModel};

use super::error::map_db_error;

/// PostgreSQL implementation of LikeLedgerStore
///
/// The `(user_id, product_id)` primary key is the compare-and-set: an insert
/// or delete reports whether this call changed the row.
#[derive(Clone)]
pub struct PgLikeLedger {
    pool: PgPool,
}

impl PgLikeLedger {
    /// Create a new PgLikeLedger
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeLedgerStore for PgLikeLedger {
    #[instrument(skip(self))]
    async fn is_liked(&self, user_id: UserId, product_id: ProductId) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM product_likes WHERE user_id = $1 AND product_id = $2
            )
            "#,
        )
        .bind(user_id.into_inner())
        .bind(product_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self), fields(user_id = %record.user_id, product_id = %record.product_id))]
    async fn insert_if_absent(&self, record: &LikeRecord) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_likes (user_id, product_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO NOTHING
            "#,
        )
        .bind(record.user_id.into_inner())
        .bind(record.product_id.into_inner())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn remove_if_present(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM product_likes WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id.into_inner())
        .bind(product_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn count_for(&self, product_id: ProductId) -> RepoResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM product_likes WHERE product_id = $1
            "#,
        )
        .bind(product_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(to_u64(count))
    }

    #[instrument(skip(self))]
    async fn active_counts(&self) -> RepoResult<HashMap<ProductId, u64>> {
        let rows = sqlx::query_as::<_, ProductLikeCountModel>(
            r#"
            SELECT product_id, COUNT(*) AS count
            FROM product_likes
            GROUP BY product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter()
            .map(|row| -> RepoResult<(ProductId, u64)> {
                let product_id =
                    ProductId::new(row.product_id).map_err(corrupt_row)?;
                Ok((product_id, to_u64(row.count)))
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn liked_by(&self, user_id: UserId) -> RepoResult<Vec<LikeRecord>> {
        let rows = sqlx::query_as::<_, LikeModel>(
            r#"
            SELECT user_id, product_id, created_at
            FROM product_likes
            WHERE user_id = $1
            ORDER BY created_at DESC, product_id DESC
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(LikeRecord::try_from).collect()
    }
}
