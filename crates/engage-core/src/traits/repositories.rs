//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Every mutation here is a single atomic
//! store operation; callers never read-then-write.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::entities::{Brand, CatalogProduct, CounterDelta, DeltaOutcome, LikeCount, LikeRecord};
use crate::error::DomainError;
use crate::value_objects::{BrandId, ProductId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Like Ledger
// ============================================================================

#[async_trait]
pub trait LikeLedgerStore: Send + Sync {
    /// Check whether the pair currently holds an active like
    async fn is_liked(&self, user_id: UserId, product_id: ProductId) -> RepoResult<bool>;

    /// Insert the record unless the pair already holds one.
    /// Returns true if this call created it.
    async fn insert_if_absent(&self, record: &LikeRecord) -> RepoResult<bool>;

    /// Remove the pair's record if present.
    /// Returns true if this call removed it.
    async fn remove_if_present(&self, user_id: UserId, product_id: ProductId)
    -> RepoResult<bool>;

    /// Number of active likes on one product
    async fn count_for(&self, product_id: ProductId) -> RepoResult<u64>;

    /// Number of active likes per product, for every product with at least one
    async fn active_counts(&self) -> RepoResult<HashMap<ProductId, u64>>;

    /// Active likes held by a user, most recent first
    async fn liked_by(&self, user_id: UserId) -> RepoResult<Vec<LikeRecord>>;
}

// ============================================================================
// Counter Store
// ============================================================================

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically apply a unit delta, clamping at zero
    async fn apply_delta(
        &self,
        product_id: ProductId,
        delta: CounterDelta,
    ) -> RepoResult<DeltaOutcome>;

    /// Atomically apply an arbitrary signed correction, clamping at zero
    async fn compensate(&self, product_id: ProductId, delta: i64) -> RepoResult<DeltaOutcome>;

    /// Current count; products never touched read as zero
    async fn get_count(&self, product_id: ProductId) -> RepoResult<LikeCount>;

    /// Every stored count
    async fn snapshot(&self) -> RepoResult<Vec<LikeCount>>;
}

// ============================================================================
// Catalog
// ============================================================================

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every listable product
    async fn all_products(&self) -> RepoResult<Vec<CatalogProduct>>;

    /// Find product by ID
    async fn find_product(&self, product_id: ProductId) -> RepoResult<Option<CatalogProduct>>;

    /// Brands for the given IDs; unknown IDs are skipped
    async fn brands(&self, ids: &[BrandId]) -> RepoResult<Vec<Brand>>;
}
