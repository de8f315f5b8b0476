//! In-memory implementation of LikeLedgerStore

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;

use engage_core::entities::LikeRecord;
use engage_core::traits::{LikeLedgerStore, RepoResult};
use engage_core::value_objects::{ProductId, UserId};

/// Like ledger held in a sharded map keyed by `(user, product)`
///
/// The map entry API gives per-key compare-and-set; pairs on different
/// shards never contend.
#[derive(Debug, Default)]
pub struct MemoryLikeLedger {
    likes: DashMap<(UserId, ProductId), LikeRecord>,
}

impl MemoryLikeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active likes across all products
    pub fn len(&self) -> usize {
        self.likes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.likes.is_empty()
    }
}

#[async_trait]
impl LikeLedgerStore for MemoryLikeLedger {
    async fn is_liked(&self, user_id: UserId, product_id: ProductId) -> RepoResult<bool> {
        Ok(self.likes.contains_key(&(user_id, product_id)))
    }

    async fn insert_if_absent(&self, record: &LikeRecord) -> RepoResult<bool> {
        match self.likes.entry((record.user_id, record.product_id)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn remove_if_present(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> RepoResult<bool> {
        Ok(self.likes.remove(&(user_id, product_id)).is_some())
    }

    async fn count_for(&self, product_id: ProductId) -> RepoResult<u64> {
        let count = self
            .likes
            .iter()
            .filter(|entry| entry.key().1 == product_id)
            .count();
        Ok(count as u64)
    }

    async fn active_counts(&self) -> RepoResult<HashMap<ProductId, u64>> {
        let mut counts = HashMap::new();
        for entry in &self.likes {
            *counts.entry(entry.key().1).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn liked_by(&self, user_id: UserId) -> RepoResult<Vec<LikeRecord>> {
        let mut records: Vec<LikeRecord> = self
            .likes
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.product_id.cmp(&a.product_id))
        });
        Ok(records)
    }
}
