//! # engage-cache
//!
//! Caching layer for like counts and ranked listings.
//!
//! ## Features
//!
//! - **Ranking Cache**: In-memory ordered indexes per sort key with brand
//!   sub-indexes, incremental like-count updates and stale-serving rebuilds
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Redis Counters**: Authoritative like counters updated by a Lua script
//!
//! ## Example
//!
//! ```ignore
//! use engage_cache::{RankingCache, RedisCounterStore, RedisPool, RedisPoolConfig};
//! use engage_core::SortKey;
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let counters = RedisCounterStore::new(pool);
//!
//! let cache = RankingCache::new();
//! cache.ensure_fresh(&source).await?;
//! let page = cache.query(SortKey::LikesDesc, None, 0, 20);
//! ```

pub mod counter;
pub mod pool;
pub mod ranking;

// Re-export pool types
pub use pool::{
    create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool,
};

// Re-export counter types
pub use counter::RedisCounterStore;

// Re-export ranking types
pub use ranking::{
    CacheState, CountUpdate, Freshness, RankingCache, RankingPage, RankingSource, RebuildSummary,
};
