//! Ranking projection source
//!
//! Loads the catalog and the counter snapshot through the gateway and joins
//! them into ranking entries for a cache rebuild.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use engage_cache::RankingSource;
use engage_core::traits::{CatalogStore, CounterStore};
use engage_core::{LikeCount, ProductId, RankingEntry, RepoResult};

use crate::resilience::{Dependency, ResilientGateway};

use super::context::ServiceContext;

/// [`RankingSource`] backed by the catalog and counter stores
pub struct StoreRankingSource {
    catalog: Arc<dyn CatalogStore>,
    counters: Arc<dyn CounterStore>,
    gateway: Arc<ResilientGateway>,
}

impl StoreRankingSource {
    pub fn new(ctx: &ServiceContext) -> Self {
        Self {
            catalog: ctx.catalog_arc(),
            counters: ctx.counter_store_arc(),
            gateway: ctx.gateway_arc(),
        }
    }
}

#[async_trait]
impl RankingSource for StoreRankingSource {
    #[instrument(skip(self))]
    async fn load_entries(&self) -> RepoResult<Vec<RankingEntry>> {
        let catalog = self.catalog.as_ref();
        let counters = self.counters.as_ref();

        let products = self
            .gateway
            .call(Dependency::Catalog, "all_products", || catalog.all_products())
            .await?;
        let counts: HashMap<ProductId, LikeCount> = self
            .gateway
            .call(Dependency::Counter, "snapshot", || counters.snapshot())
            .await?
            .into_iter()
            .map(|count| (count.product_id, count))
            .collect();

        debug!(
            products = products.len(),
            counters = counts.len(),
            "Loaded ranking projection"
        );

        Ok(products
            .iter()
            .map(|product| RankingEntry::project(product, counts.get(&product.id)))
            .collect())
    }
}
