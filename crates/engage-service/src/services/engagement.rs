//! Engagement service
//!
//! Orchestrates like/unlike requests across the ledger, the counter store and
//! the ranking cache, and serves ranked product listings.
//!
//! A write moves through RECEIVED → LEDGER_APPLIED → COUNTER_APPLIED →
//! CACHE_APPLIED → ACKED. Only a ledger failure fails the request; a counter
//! failure is acknowledged with the count flagged as pending and handed to the
//! reconciler, and the cache is repaired asynchronously.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use chrono::{DateTime, Utc};
use engage_cache::{CacheState, CountUpdate, Freshness, RebuildSummary};
use engage_core::{
    BrandId, DomainError, LikeAction, LikeState, ProductId, RankingEntry, SortKey, UserId,
};

use crate::resilience::{CircuitSnapshot, Dependency};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::ledger::LikeLedger;
use super::projection::StoreRankingSource;
use super::reconciler::{ReconcileReport, Reconciler};

/// Progress of a like/unlike request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    LedgerApplied,
    CounterApplied,
    CacheApplied,
    Acked,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "RECEIVED"),
            Self::LedgerApplied => write!(f, "LEDGER_APPLIED"),
            Self::CounterApplied => write!(f, "COUNTER_APPLIED"),
            Self::CacheApplied => write!(f, "CACHE_APPLIED"),
            Self::Acked => write!(f, "ACKED"),
        }
    }
}

/// Acknowledged like/unlike/toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeResult {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub state: LikeState,
    /// The pair was already in the requested state
    pub noop: bool,
    pub like_count: u64,
    /// The counter could not be updated or read; `like_count` may lag
    pub count_pending: bool,
}

/// Like count of one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeCountView {
    pub product_id: ProductId,
    pub like_count: u64,
    /// Served from the ranking cache because the counter store was unavailable
    pub stale: bool,
}

/// Listing parameters after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingQuery {
    pub sort: SortKey,
    pub brand_id: Option<BrandId>,
    /// Zero-based page index
    pub page: usize,
    pub size: usize,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            sort: SortKey::default(),
            brand_id: None,
            page: 0,
            size: 20,
        }
    }
}

/// Ranking entry enriched with its brand name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedProduct {
    pub entry: RankingEntry,
    /// None when the catalog could not be asked
    pub brand_name: Option<String>,
}

/// One page of a product listing
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub items: Vec<ListedProduct>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
    /// Contents may lag the stores (failed rebuild or degraded write path)
    pub stale: bool,
    /// Dependencies that could not be consulted for this response
    pub degraded: Vec<Dependency>,
}

/// One product with its brand, as served by the detail view
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: ListedProduct,
    /// The like count may lag the counter store
    pub stale: bool,
    /// Dependencies that could not be consulted for this response
    pub degraded: Vec<Dependency>,
}

/// A product the caller currently likes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikedProduct {
    pub product: ListedProduct,
    pub liked_at: DateTime<Utc>,
}

/// Engagement service
pub struct EngagementService {
    ctx: ServiceContext,
    ledger: LikeLedger,
    source: StoreRankingSource,
    reconciler: Arc<Reconciler>,
}

impl EngagementService {
    /// Create the service and its reconciler over one context
    pub fn new(ctx: ServiceContext) -> Self {
        let ledger = LikeLedger::new(
            ctx.ledger_store_arc(),
            ctx.gateway_arc(),
            ctx.settings().conflict_retries,
        );
        let source = StoreRankingSource::new(&ctx);
        let reconciler = Arc::new(Reconciler::new(&ctx));
        Self {
            ctx,
            ledger,
            source,
            reconciler,
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Handle for spawning the background reconciler
    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::clone(&self.reconciler)
    }

    // === Writes ===

    /// Idempotently like a product
    pub async fn like(&self, user_id: UserId, product_id: ProductId) -> ServiceResult<LikeResult> {
        self.apply(user_id, product_id, LikeAction::Like).await
    }

    /// Idempotently unlike a product
    pub async fn unlike(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> ServiceResult<LikeResult> {
        self.apply(user_id, product_id, LikeAction::Unlike).await
    }

    /// Flip the caller's like on a product
    pub async fn toggle_like(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> ServiceResult<LikeResult> {
        self.apply(user_id, product_id, LikeAction::Toggle).await
    }

    #[instrument(skip(self))]
    async fn apply(
        &self,
        user_id: UserId,
        product_id: ProductId,
        action: LikeAction,
    ) -> ServiceResult<LikeResult> {
        debug!(stage = %RequestStage::Received, "Like request received");
        self.ensure_product(product_id).await?;

        let outcome = self.ledger.apply(user_id, product_id, action).await?;
        debug!(
            stage = %RequestStage::LedgerApplied,
            state = %outcome.applied,
            noop = outcome.noop,
            "Ledger applied"
        );

        let (like_count, count_pending) = match outcome.delta() {
            None => self.current_count(product_id).await,
            Some(delta) => {
                let counters = self.ctx.counter_store();
                match self
                    .ctx
                    .gateway()
                    .call(Dependency::Counter, "apply_delta", || {
                        counters.apply_delta(product_id, delta)
                    })
                    .await
                {
                    Ok(applied) => {
                        if applied.clamped {
                            warn!(product_id = %product_id, "Counter clamped at zero");
                            self.ctx.signal().raise("counter_clamped");
                        }
                        debug!(
                            stage = %RequestStage::CounterApplied,
                            count = applied.count.count,
                            version = applied.count.version,
                            "Counter applied"
                        );

                        let update = self.ctx.ranking_cache().apply_count_update(
                            product_id,
                            applied.count.count,
                            applied.count.version,
                        );
                        if update == CountUpdate::Missing {
                            debug!(product_id = %product_id, "Product not cached yet");
                        }
                        debug!(stage = %RequestStage::CacheApplied, ?update, "Cache updated");

                        (applied.count.count, false)
                    }
                    Err(err) => {
                        warn!(
                            product_id = %product_id,
                            error = %err,
                            "Counter update failed after ledger write, deferring to reconciler"
                        );
                        self.ctx.signal().raise("counter_failed");
                        let estimate = self.ctx.ranking_cache().like_count(product_id).map_or(
                            0,
                            |cached| {
                                (cached as i64 + delta.as_i64()).max(0) as u64
                            },
                        );
                        (estimate, true)
                    }
                }
            }
        };

        info!(
            stage = %RequestStage::Acked,
            user_id = %user_id,
            product_id = %product_id,
            state = %outcome.applied,
            like_count,
            count_pending,
            "Like request acknowledged"
        );

        Ok(LikeResult {
            user_id,
            product_id,
            state: outcome.applied,
            noop: outcome.noop,
            like_count,
            count_pending,
        })
    }

    // === Reads ===

    /// Current like count of a product
    #[instrument(skip(self))]
    pub async fn like_count(&self, product_id: ProductId) -> ServiceResult<LikeCountView> {
        self.ensure_product(product_id).await?;
        let (like_count, stale) = self.current_count(product_id).await;
        Ok(LikeCountView {
            product_id,
            like_count,
            stale,
        })
    }

    /// Products the user currently likes, most recent first
    #[instrument(skip(self))]
    pub async fn liked_products(&self, user_id: UserId) -> ServiceResult<Vec<LikedProduct>> {
        let records = self.ledger.liked_by(user_id).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let cache = self.ctx.ranking_cache();
        cache.ensure_fresh(&self.source).await?;

        let entries: Vec<(RankingEntry, DateTime<Utc>)> = records
            .into_iter()
            .filter_map(|record| {
                cache
                    .entry(record.product_id)
                    .map(|entry| (entry, record.created_at))
            })
            .collect();

        let mut degraded = Vec::new();
        let names = self
            .brand_names(entries.iter().map(|(entry, _)| entry.brand_id), &mut degraded)
            .await;

        Ok(entries
            .into_iter()
            .map(|(entry, liked_at)| LikedProduct {
                product: ListedProduct {
                    brand_name: names.get(&entry.brand_id).cloned(),
                    entry,
                },
                liked_at,
            })
            .collect())
    }

    /// One page of ranked products
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ListingQuery) -> ServiceResult<ListingPage> {
        let cache = self.ctx.ranking_cache();
        let freshness = cache.ensure_fresh(&self.source).await?;

        let page = cache.query(query.sort, query.brand_id, query.page, query.size);

        let mut degraded = Vec::new();
        let counter_open = self.ctx.gateway().is_open(Dependency::Counter);
        if counter_open {
            degraded.push(Dependency::Counter);
        }
        let names = self
            .brand_names(page.entries.iter().map(|entry| entry.brand_id), &mut degraded)
            .await;

        let stale = freshness == Freshness::Stale || counter_open;
        if stale {
            debug!(?freshness, "Serving listing flagged stale");
        }

        Ok(ListingPage {
            items: page
                .entries
                .into_iter()
                .map(|entry| ListedProduct {
                    brand_name: names.get(&entry.brand_id).cloned(),
                    entry,
                })
                .collect(),
            page: query.page,
            size: query.size,
            total: page.total,
            stale,
            degraded,
        })
    }

    /// One product with its brand name and cached like count
    ///
    /// Products added to the catalog since the last rebuild are projected
    /// from the stores directly and the cache is marked for rebuild.
    #[instrument(skip(self))]
    pub async fn product_detail(&self, product_id: ProductId) -> ServiceResult<ProductDetail> {
        let cache = self.ctx.ranking_cache();
        let freshness = cache.ensure_fresh(&self.source).await?;

        let mut degraded = Vec::new();
        let counter_open = self.ctx.gateway().is_open(Dependency::Counter);
        if counter_open {
            degraded.push(Dependency::Counter);
        }

        let (entry, count_stale) = match cache.entry(product_id) {
            Some(entry) => (entry, false),
            None => self.project_uncached(product_id).await?,
        };

        let names = self
            .brand_names(std::iter::once(entry.brand_id), &mut degraded)
            .await;

        Ok(ProductDetail {
            product: ListedProduct {
                brand_name: names.get(&entry.brand_id).cloned(),
                entry,
            },
            stale: freshness == Freshness::Stale || counter_open || count_stale,
            degraded,
        })
    }

    // === Maintenance ===

    /// Rebuild the ranking cache from the stores
    pub async fn rebuild_cache(&self) -> ServiceResult<RebuildSummary> {
        Ok(self.ctx.ranking_cache().rebuild(&self.source).await?)
    }

    /// Run one reconciliation pass now
    pub async fn reconcile_now(&self) -> ServiceResult<ReconcileReport> {
        Ok(self.reconciler.run_once().await?)
    }

    pub fn cache_state(&self) -> CacheState {
        self.ctx.ranking_cache().state()
    }

    pub fn circuit_states(&self) -> Vec<CircuitSnapshot> {
        self.ctx.gateway().circuit_states()
    }

    // === Helpers ===

    /// Cache fast path, then a catalog lookup
    async fn ensure_product(&self, product_id: ProductId) -> ServiceResult<()> {
        if self.ctx.ranking_cache().contains(product_id) {
            return Ok(());
        }

        let catalog = self.ctx.catalog();
        let found = self
            .ctx
            .gateway()
            .call(Dependency::Catalog, "find_product", || {
                catalog.find_product(product_id)
            })
            .await?;

        match found {
            Some(_) => Ok(()),
            None => Err(DomainError::ProductNotFound(product_id).into()),
        }
    }

    /// Ranking entry for a product missing from the cache, read from the
    /// catalog and the counter store. The flag is true when the counter
    /// could not be read.
    async fn project_uncached(&self, product_id: ProductId) -> ServiceResult<(RankingEntry, bool)> {
        let catalog = self.ctx.catalog();
        let product = self
            .ctx
            .gateway()
            .call(Dependency::Catalog, "find_product", || {
                catalog.find_product(product_id)
            })
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;

        self.ctx.ranking_cache().invalidate();
        debug!(product_id = %product_id, "Product missing from ranking cache");

        let counters = self.ctx.counter_store();
        let count = self
            .ctx
            .gateway()
            .call(Dependency::Counter, "get_count", || {
                counters.get_count(product_id)
            })
            .await;
        let stale = count.is_err();
        Ok((RankingEntry::project(&product, count.ok().as_ref()), stale))
    }

    /// Authoritative count, falling back to the cached one when the counter
    /// store cannot be read. The flag is true for the fallback.
    async fn current_count(&self, product_id: ProductId) -> (u64, bool) {
        let counters = self.ctx.counter_store();
        match self
            .ctx
            .gateway()
            .call(Dependency::Counter, "get_count", || {
                counters.get_count(product_id)
            })
            .await
        {
            Ok(count) => (count.count, false),
            Err(err) => {
                debug!(product_id = %product_id, error = %err, "Counter read failed, using cache");
                (
                    self.ctx.ranking_cache().like_count(product_id).unwrap_or(0),
                    true,
                )
            }
        }
    }

    /// Brand names for the given brands; an unavailable catalog yields an
    /// empty map and is reported in `degraded`
    async fn brand_names(
        &self,
        brand_ids: impl Iterator<Item = BrandId>,
        degraded: &mut Vec<Dependency>,
    ) -> HashMap<BrandId, String> {
        let ids: Vec<BrandId> = brand_ids.collect::<HashSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return HashMap::new();
        }

        let catalog = self.ctx.catalog();
        let ids = &ids;
        match self
            .ctx
            .gateway()
            .call(Dependency::Catalog, "brands", || catalog.brands(ids))
            .await
        {
            Ok(brands) => brands.into_iter().map(|b| (b.id, b.name)).collect(),
            Err(err) => {
                debug!(error = %err, "Brand names unavailable");
                degraded.push(Dependency::Catalog);
                HashMap::new()
            }
        }
    }
}
