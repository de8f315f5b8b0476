//! Like ledger
//!
//! Applies like, unlike and toggle actions to the per-(user, product) ledger
//! with compare-and-set writes. Concurrent actions on one pair serialize on
//! the store's atomic insert/remove; a lost race re-reads and tries again.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use engage_core::traits::LikeLedgerStore;
use engage_core::{
    DomainError, LikeAction, LikeRecord, ProductId, RepoResult, ToggleOutcome, UserId,
};

use crate::resilience::{Dependency, ResilientGateway};

/// Compare-and-set front end over a [`LikeLedgerStore`]
pub struct LikeLedger {
    store: Arc<dyn LikeLedgerStore>,
    gateway: Arc<ResilientGateway>,
    conflict_retries: u32,
}

impl LikeLedger {
    pub fn new(
        store: Arc<dyn LikeLedgerStore>,
        gateway: Arc<ResilientGateway>,
        conflict_retries: u32,
    ) -> Self {
        Self {
            store,
            gateway,
            conflict_retries: conflict_retries.max(1),
        }
    }

    /// Apply an action to the pair.
    ///
    /// Every successful compare-and-set yields exactly one non-noop outcome.
    /// Fails with `Conflict` when the pair keeps changing underneath for
    /// the whole retry bound.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        user_id: UserId,
        product_id: ProductId,
        action: LikeAction,
    ) -> RepoResult<ToggleOutcome> {
        let store = self.store.as_ref();

        for attempt in 1..=self.conflict_retries {
            let active = self
                .gateway
                .call(Dependency::Ledger, "is_liked", || {
                    store.is_liked(user_id, product_id)
                })
                .await?;

            let target = action.target(active);
            if target.is_active() == active {
                return Ok(ToggleOutcome {
                    applied: target,
                    noop: true,
                });
            }

            let won = if target.is_active() {
                let record = LikeRecord::new(user_id, product_id);
                let record = &record;
                self.gateway
                    .call(Dependency::Ledger, "insert_if_absent", || {
                        store.insert_if_absent(record)
                    })
                    .await?
            } else {
                self.gateway
                    .call(Dependency::Ledger, "remove_if_present", || {
                        store.remove_if_present(user_id, product_id)
                    })
                    .await?
            };

            if won {
                return Ok(ToggleOutcome {
                    applied: target,
                    noop: false,
                });
            }

            debug!(attempt, "Lost ledger compare-and-set, re-reading");
        }

        warn!(
            user_id = %user_id,
            product_id = %product_id,
            attempts = self.conflict_retries,
            "Ledger contention exhausted retries"
        );
        Err(DomainError::Conflict {
            product_id,
            attempts: self.conflict_retries,
        })
    }

    /// Active likes held by a user, most recent first
    pub async fn liked_by(&self, user_id: UserId) -> RepoResult<Vec<LikeRecord>> {
        let store = self.store.as_ref();
        self.gateway
            .call(Dependency::Ledger, "liked_by", || store.liked_by(user_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engage_common::ResilienceConfig;
    use engage_core::LikeState;
    use engage_db::MemoryLikeLedger;
    use std::collections::HashMap;

    fn ids() -> (UserId, ProductId) {
        (UserId::new(7).unwrap(), ProductId::new(42).unwrap())
    }

    fn ledger_over(store: Arc<dyn LikeLedgerStore>) -> LikeLedger {
        let gateway = Arc::new(ResilientGateway::new(&ResilienceConfig::default()));
        LikeLedger::new(store, gateway, 3)
    }

    #[tokio::test]
    async fn test_toggle_alternates() {
        let (user, product) = ids();
        let store = Arc::new(MemoryLikeLedger::new());
        let ledger = ledger_over(store.clone());

        let first = ledger.apply(user, product, LikeAction::Toggle).await.unwrap();
        let second = ledger.apply(user, product, LikeAction::Toggle).await.unwrap();

        assert_eq!(first.applied, LikeState::Activated);
        assert_eq!(second.applied, LikeState::Deactivated);
        assert!(!first.noop && !second.noop);
        assert!(!store.is_liked(user, product).await.unwrap());
    }

    #[tokio::test]
    async fn test_like_and_unlike_are_idempotent() {
        let (user, product) = ids();
        let ledger = ledger_over(Arc::new(MemoryLikeLedger::new()));

        assert!(!ledger.apply(user, product, LikeAction::Like).await.unwrap().noop);
        let again = ledger.apply(user, product, LikeAction::Like).await.unwrap();
        assert!(again.noop);
        assert_eq!(again.applied, LikeState::Activated);

        assert!(!ledger.apply(user, product, LikeAction::Unlike).await.unwrap().noop);
        let again = ledger.apply(user, product, LikeAction::Unlike).await.unwrap();
        assert!(again.noop);
        assert_eq!(again.applied, LikeState::Deactivated);
    }

    #[tokio::test]
    async fn test_concurrent_likes_have_one_winner() {
        let (user, product) = ids();
        let ledger = Arc::new(ledger_over(Arc::new(MemoryLikeLedger::new())));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.apply(user, product, LikeAction::Like).await })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if !task.await.unwrap().unwrap().noop {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    /// Store whose compare-and-set always loses, as if another writer kept
    /// flipping the pair between the read and the write
    struct ContendedLedger;

    #[async_trait]
    impl LikeLedgerStore for ContendedLedger {
        async fn is_liked(&self, _: UserId, _: ProductId) -> RepoResult<bool> {
            Ok(false)
        }
        async fn insert_if_absent(&self, _: &LikeRecord) -> RepoResult<bool> {
            Ok(false)
        }
        async fn remove_if_present(&self, _: UserId, _: ProductId) -> RepoResult<bool> {
            Ok(false)
        }
        async fn count_for(&self, _: ProductId) -> RepoResult<u64> {
            Ok(0)
        }
        async fn active_counts(&self) -> RepoResult<HashMap<ProductId, u64>> {
            Ok(HashMap::new())
        }
        async fn liked_by(&self, _: UserId) -> RepoResult<Vec<LikeRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_exhausted_contention_is_a_conflict() {
        let (user, product) = ids();
        let ledger = ledger_over(Arc::new(ContendedLedger));

        let err = ledger
            .apply(user, product, LikeAction::Toggle)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(matches!(err, DomainError::Conflict { attempts: 3, .. }));
    }
}
