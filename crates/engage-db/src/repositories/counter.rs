//! PostgreSQL implementation of CounterStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use engage_core::entities::{CounterDelta, DeltaOutcome, LikeCount};
use engage_core::traits::{CounterStore, RepoResult};
use engage_core::value_objects::ProductId;

use crate::models::{LikeSummaryDeltaModel, LikeSummaryModel};

use super::error::map_db_error;

/// PostgreSQL implementation of CounterStore backed by `like_summary`
///
/// A delta runs in one transaction: the row is created if missing, locked
/// with `FOR UPDATE` to read the previous count, then updated with
/// `GREATEST` clamping at zero and a version bump. The lock serializes
/// concurrent deltas on the same product.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    /// Create a new PgCounterStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply(&self, product_id: ProductId, delta: i64) -> RepoResult<DeltaOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r#"
            INSERT INTO like_summary (product_id, like_count, version, updated_at)
            VALUES ($1, 0, 0, now())
            ON CONFLICT (product_id) DO NOTHING
            "#,
        )
        .bind(product_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let previous: i64 = sqlx::query_scalar(
            r#"
            SELECT like_count FROM like_summary WHERE product_id = $1 FOR UPDATE
            "#,
        )
        .bind(product_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let row = sqlx::query_as::<_, LikeSummaryDeltaModel>(
            r#"
            UPDATE like_summary
            SET like_count = GREATEST(like_count + $2::BIGINT, 0),
                version = version + 1,
                updated_at = now()
            WHERE product_id = $1
            RETURNING product_id, like_count, version, updated_at,
                      ($3::BIGINT + $2::BIGINT < 0) AS clamped
            "#,
        )
        .bind(product_id.into_inner())
        .bind(delta)
        .bind(previous)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        let outcome = DeltaOutcome::try_from(row)?;
        debug!(
            product_id = %product_id,
            delta,
            count = outcome.count.count,
            version = outcome.count.version,
            clamped = outcome.clamped,
            "Counter delta applied"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    #[instrument(skip(self))]
    async fn apply_delta(
        &self,
        product_id: ProductId,
        delta: CounterDelta,
    ) -> RepoResult<DeltaOutcome> {
        self.apply(product_id, delta.as_i64()).await
    }

    #[instrument(skip(self))]
    async fn compensate(&self, product_id: ProductId, delta: i64) -> RepoResult<DeltaOutcome> {
        self.apply(product_id, delta).await
    }

    #[instrument(skip(self))]
    async fn get_count(&self, product_id: ProductId) -> RepoResult<LikeCount> {
        let row = sqlx::query_as::<_, LikeSummaryModel>(
            r#"
            SELECT product_id, like_count, version, updated_at
            FROM like_summary
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match row {
            Some(row) => LikeCount::try_from(row),
            None => Ok(LikeCount::zero(product_id)),
        }
    }

    #[instrument(skip(self))]
    async fn snapshot(&self) -> RepoResult<Vec<LikeCount>> {
        let rows = sqlx::query_as::<_, LikeSummaryModel>(
            r#"
            SELECT product_id, like_count, version, updated_at
            FROM like_summary
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(LikeCount::try_from).collect()
    }
}
