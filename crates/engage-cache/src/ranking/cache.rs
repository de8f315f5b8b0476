//! In-memory ranking cache.
//!
//! One ordered index per [`SortKey`], each behind its own read/write lock.
//! Lock order is always shard locks (in slot order) before the entry map,
//! so a reader holding a shard read lock sees entries consistent with that
//! shard's ordering.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use engage_core::entities::RankingEntry;
use engage_core::traits::RepoResult;
use engage_core::value_objects::{BrandId, ProductId, SortKey};

use super::index::SortIndex;

/// Loads the full set of ranking entries from the authoritative stores
#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn load_entries(&self) -> RepoResult<Vec<RankingEntry>>;
}

/// Lifecycle of the cache contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheState {
    /// Never populated
    Cold,
    /// Populated and not invalidated since
    Warm,
    /// Populated, but marked for rebuild
    Dirty,
}

/// Whether served data reflects the latest rebuild request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// A rebuild was needed and failed; previous contents are served
    Stale,
}

/// Result of an incremental like-count update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountUpdate {
    Applied,
    /// The cached entry already holds this or a newer version
    Ignored,
    /// Product not cached; the cache is marked for rebuild
    Missing,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct RankingPage {
    pub entries: Vec<RankingEntry>,
    /// Entries matching the filter across all pages
    pub total: usize,
}

/// Summary of a completed rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSummary {
    pub entries: usize,
    /// Updates applied during the load that overrode loaded counts
    pub merged: usize,
}

/// Cached ranking projection with one ordered index per sort key
pub struct RankingCache {
    entries: DashMap<ProductId, RankingEntry>,
    shards: [RwLock<SortIndex>; SortKey::COUNT],
    populated: AtomicBool,
    /// Bumped by every invalidation or miss
    invalidations: AtomicU64,
    /// Invalidation count observed when the installed contents were loaded
    built_from: AtomicU64,
    last_rebuild: Mutex<Option<Instant>>,
    /// Updates seen while a rebuild is loading, keyed by product
    in_flight: Mutex<Option<HashMap<ProductId, (u64, u64)>>>,
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for RankingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingCache")
            .field("entries", &self.entries.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for RankingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            shards: std::array::from_fn(|_| RwLock::new(SortIndex::default())),
            populated: AtomicBool::new(false),
            invalidations: AtomicU64::new(0),
            built_from: AtomicU64::new(0),
            last_rebuild: Mutex::new(None),
            in_flight: Mutex::new(None),
            rebuild_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> CacheState {
        if !self.populated.load(Ordering::Acquire) {
            CacheState::Cold
        } else if self.invalidations.load(Ordering::Acquire) > self.built_from.load(Ordering::Acquire)
        {
            CacheState::Dirty
        } else {
            CacheState::Warm
        }
    }

    /// Number of cached products
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the product is cached
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.entries.contains_key(&product_id)
    }

    /// Cached like count for one product
    pub fn like_count(&self, product_id: ProductId) -> Option<u64> {
        self.entries.get(&product_id).map(|entry| entry.like_count)
    }

    /// Copy of one cached entry
    pub fn entry(&self, product_id: ProductId) -> Option<RankingEntry> {
        self.entries.get(&product_id).map(|entry| entry.clone())
    }

    /// Cached `(count, version)` for every product
    pub fn cached_counts(&self) -> HashMap<ProductId, (u64, u64)> {
        self.entries
            .iter()
            .map(|entry| (*entry.key(), (entry.like_count, entry.version)))
            .collect()
    }

    /// Whether the last rebuild completed less than `interval` ago
    pub fn rebuilt_within(&self, interval: Duration) -> bool {
        self.last_rebuild
            .lock()
            .is_some_and(|at| at.elapsed() < interval)
    }

    /// Mark the contents for rebuild without discarding them
    pub fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::AcqRel);
        debug!("Ranking cache invalidated");
    }

    /// Copy one page out of the index for `key`
    ///
    /// Pages are offset based: `page` is zero-based and an empty page is
    /// returned past the end.
    pub fn query(
        &self,
        key: SortKey,
        brand: Option<BrandId>,
        page: usize,
        size: usize,
    ) -> RankingPage {
        let shard = self.shards[key.slot()].read();
        let Some(scope) = shard.scope(brand) else {
            return RankingPage::default();
        };

        let entries = scope
            .iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .filter_map(|(_, id)| self.entries.get(id).map(|entry| entry.clone()))
            .collect();

        RankingPage {
            entries,
            total: scope.len(),
        }
    }

    /// Reposition a product after a counter change
    ///
    /// Updates carrying a version at or below the cached one are ignored,
    /// so out-of-order deliveries never move a count backwards.
    pub fn apply_count_update(&self, product_id: ProductId, count: u64, version: u64) -> CountUpdate {
        let mut likes = self.shards[SortKey::LikesDesc.slot()].write();

        if let Some(pending) = self.in_flight.lock().as_mut() {
            let slot = pending.entry(product_id).or_insert((count, version));
            if version > slot.1 {
                *slot = (count, version);
            }
        }

        let Some(mut entry) = self.entries.get_mut(&product_id) else {
            drop(likes);
            self.invalidate();
            debug!(product_id = %product_id, "Count update for uncached product");
            return CountUpdate::Missing;
        };

        if version <= entry.version {
            return CountUpdate::Ignored;
        }

        let from = SortKey::LikesDesc.rank(&entry);
        entry.like_count = count;
        entry.version = version;
        let to = SortKey::LikesDesc.rank(&entry);
        likes.reposition(entry.brand_id, product_id, from, to);

        CountUpdate::Applied
    }

    /// Overwrite a cached count if the entry still holds `expected_version`
    ///
    /// Used for drift repair after the counter value has been confirmed. An
    /// entry moved on by a concurrent [`apply_count_update`](Self::apply_count_update)
    /// is left alone and `false` is returned.
    pub fn repair_count(
        &self,
        product_id: ProductId,
        expected_version: u64,
        count: u64,
        version: u64,
    ) -> bool {
        let mut likes = self.shards[SortKey::LikesDesc.slot()].write();
        let Some(mut entry) = self.entries.get_mut(&product_id) else {
            return false;
        };
        if entry.version != expected_version {
            return false;
        }

        let from = SortKey::LikesDesc.rank(&entry);
        entry.like_count = count;
        entry.version = version;
        let to = SortKey::LikesDesc.rank(&entry);
        likes.reposition(entry.brand_id, product_id, from, to);
        true
    }

    /// Rebuild only if the cache is cold or dirty
    ///
    /// Concurrent callers share one rebuild. When the rebuild fails and
    /// previous contents exist they keep being served as [`Freshness::Stale`];
    /// a cold cache surfaces the error.
    pub async fn ensure_fresh(&self, source: &dyn RankingSource) -> RepoResult<Freshness> {
        if self.state() == CacheState::Warm {
            return Ok(Freshness::Fresh);
        }

        let _guard = self.rebuild_lock.lock().await;
        if self.state() == CacheState::Warm {
            return Ok(Freshness::Fresh);
        }

        match self.load_and_install(source).await {
            Ok(_) => Ok(Freshness::Fresh),
            Err(err) if self.populated.load(Ordering::Acquire) => {
                warn!(error = %err, "Ranking rebuild failed, serving previous contents");
                Ok(Freshness::Stale)
            }
            Err(err) => Err(err),
        }
    }

    /// Rebuild unconditionally
    pub async fn rebuild(&self, source: &dyn RankingSource) -> RepoResult<RebuildSummary> {
        let _guard = self.rebuild_lock.lock().await;
        self.load_and_install(source).await
    }

    #[instrument(skip_all)]
    async fn load_and_install(&self, source: &dyn RankingSource) -> RepoResult<RebuildSummary> {
        let epoch = self.invalidations.load(Ordering::Acquire);
        *self.in_flight.lock() = Some(HashMap::new());

        let mut entries = match source.load_entries().await {
            Ok(entries) => entries,
            Err(err) => {
                *self.in_flight.lock() = None;
                return Err(err);
            }
        };

        // Indexes are built before any shard lock is taken
        let mut indexes: [SortIndex; SortKey::COUNT] =
            std::array::from_fn(|slot| SortIndex::build(SortKey::ALL[slot], &entries));

        let mut guards: Vec<_> = self.shards.iter().map(|shard| shard.write()).collect();

        // With every shard locked no update can be recording, so `pending`
        // holds exactly the updates that raced the load
        let pending = self.in_flight.lock().take().unwrap_or_default();
        let likes_slot = SortKey::LikesDesc.slot();
        let mut merged = 0;
        for entry in &mut entries {
            let Some(&(count, version)) = pending.get(&entry.product_id) else {
                continue;
            };
            if version > entry.version {
                let from = SortKey::LikesDesc.rank(entry);
                entry.like_count = count;
                entry.version = version;
                let to = SortKey::LikesDesc.rank(entry);
                indexes[likes_slot].reposition(entry.brand_id, entry.product_id, from, to);
                merged += 1;
            }
        }

        let keep: HashSet<ProductId> = entries.iter().map(|e| e.product_id).collect();
        self.entries.retain(|id, _| keep.contains(id));
        let count = entries.len();
        for entry in entries {
            self.entries.insert(entry.product_id, entry);
        }
        for (guard, index) in guards.iter_mut().zip(indexes) {
            **guard = index;
        }
        drop(guards);

        self.built_from.store(epoch, Ordering::Release);
        self.populated.store(true, Ordering::Release);
        *self.last_rebuild.lock() = Some(Instant::now());

        info!(entries = count, merged, "Ranking cache rebuilt");
        Ok(RebuildSummary {
            entries: count,
            merged,
        })
    }
}
