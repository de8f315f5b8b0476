//! Redis implementation of CounterStore.
//!
//! Counts, versions and update times live in three hashes keyed by product
//! id. A Lua script applies the delta, clamps at zero and bumps the version
//! in one atomic step on the server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::Script;
use std::collections::HashMap;
use tracing::{debug, instrument};

use engage_core::entities::{CounterDelta, DeltaOutcome, LikeCount};
use engage_core::traits::{CounterStore, RepoResult};
use engage_core::value_objects::ProductId;

use crate::pool::{RedisPool, RedisPoolError};

/// Hash of product id -> like count
const COUNT_KEY: &str = "likes:count";
/// Hash of product id -> counter version
const VERSION_KEY: &str = "likes:version";
/// Hash of product id -> last update (unix micros)
const UPDATED_KEY: &str = "likes:updated_at";

const APPLY_DELTA_SCRIPT: &str = r"
local count = redis.call('HINCRBY', KEYS[1], ARGV[1], ARGV[2])
local clamped = 0
if count < 0 then
    redis.call('HSET', KEYS[1], ARGV[1], 0)
    count = 0
    clamped = 1
end
local version = redis.call('HINCRBY', KEYS[2], ARGV[1], 1)
redis.call('HSET', KEYS[3], ARGV[1], ARGV[3])
return {count, version, clamped}
";

/// Redis-backed authoritative like counters
#[derive(Clone)]
pub struct RedisCounterStore {
    pool: RedisPool,
    apply_script: Script,
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn micros_to_time(micros: Option<i64>) -> DateTime<Utc> {
    micros
        .and_then(DateTime::from_timestamp_micros)
        .unwrap_or_default()
}

impl RedisCounterStore {
    /// Create a new RedisCounterStore
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            apply_script: Script::new(APPLY_DELTA_SCRIPT),
        }
    }

    async fn apply(&self, product_id: ProductId, delta: i64) -> RepoResult<DeltaOutcome> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now();

        let (count, version, clamped): (i64, i64, i64) = self
            .apply_script
            .key(COUNT_KEY)
            .key(VERSION_KEY)
            .key(UPDATED_KEY)
            .arg(product_id.into_inner())
            .arg(delta)
            .arg(now.timestamp_micros())
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        debug!(product_id = %product_id, delta, count, version, clamped, "Counter delta applied");

        Ok(DeltaOutcome {
            count: LikeCount {
                product_id,
                count: to_u64(count),
                version: to_u64(version),
                updated_at: now,
            },
            clamped: clamped != 0,
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
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
        let mut conn = self.pool.get().await?;
        let field = product_id.into_inner();

        let (count, version, updated): (Option<i64>, Option<i64>, Option<i64>) = redis::pipe()
            .hget(COUNT_KEY, field)
            .hget(VERSION_KEY, field)
            .hget(UPDATED_KEY, field)
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(LikeCount {
            product_id,
            count: count.map_or(0, to_u64),
            version: version.map_or(0, to_u64),
            updated_at: micros_to_time(updated),
        })
    }

    #[instrument(skip(self))]
    async fn snapshot(&self) -> RepoResult<Vec<LikeCount>> {
        let mut conn = self.pool.get().await?;

        let (counts, versions, updated): (
            HashMap<i64, i64>,
            HashMap<i64, i64>,
            HashMap<i64, i64>,
        ) = redis::pipe()
            .hgetall(COUNT_KEY)
            .hgetall(VERSION_KEY)
            .hgetall(UPDATED_KEY)
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        counts
            .into_iter()
            .map(|(id, count)| -> RepoResult<LikeCount> {
                let product_id = ProductId::new(id).map_err(|e| {
                    RedisPoolError::UnexpectedReply(format!("counter field {id}: {e}"))
                })?;
                Ok(LikeCount {
                    product_id,
                    count: to_u64(count),
                    version: versions.get(&id).copied().map_or(0, to_u64),
                    updated_at: micros_to_time(updated.get(&id).copied()),
                })
            })
            .collect()
    }
}
