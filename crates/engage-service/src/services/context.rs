//! Service context - dependency container for services
//!
//! Holds the storage ports, the resilience gateway, the ranking cache and the
//! reconciliation signal shared by the engagement service and the reconciler.

use std::sync::Arc;
use std::time::Duration;

use engage_cache::RankingCache;
use engage_common::{AppConfig, ReconcilerConfig, ResilienceConfig};
use engage_core::traits::{CatalogStore, CounterStore, LikeLedgerStore};

use crate::resilience::ResilientGateway;

use super::error::{ServiceError, ServiceResult};
use super::reconciler::ReconcileSignal;

/// Tunables for the like workflow and background maintenance
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Compare-and-set attempts before a ledger write reports a conflict
    pub conflict_retries: u32,
    /// Interval between scheduled full cache rebuilds
    pub rebuild_interval: Duration,
    pub reconciler: ReconcilerConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            conflict_retries: ResilienceConfig::default().ledger_conflict_retries,
            rebuild_interval: Duration::from_secs(60),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            conflict_retries: config.resilience.ledger_conflict_retries,
            rebuild_interval: config.ranking.rebuild_interval,
            reconciler: config.reconciler.clone(),
        }
    }
}

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Storage ports
    ledger_store: Arc<dyn LikeLedgerStore>,
    counter_store: Arc<dyn CounterStore>,
    catalog: Arc<dyn CatalogStore>,

    // Resilience
    gateway: Arc<ResilientGateway>,

    // Cache
    ranking_cache: Arc<RankingCache>,

    // Background maintenance
    signal: ReconcileSignal,
    settings: EngineSettings,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        ledger_store: Arc<dyn LikeLedgerStore>,
        counter_store: Arc<dyn CounterStore>,
        catalog: Arc<dyn CatalogStore>,
        gateway: Arc<ResilientGateway>,
        ranking_cache: Arc<RankingCache>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            ledger_store,
            counter_store,
            catalog,
            gateway,
            ranking_cache,
            signal: ReconcileSignal::new(),
            settings,
        }
    }

    // === Storage ports ===

    /// Get the like ledger store
    pub fn ledger_store(&self) -> &dyn LikeLedgerStore {
        self.ledger_store.as_ref()
    }

    /// Get the counter store
    pub fn counter_store(&self) -> &dyn CounterStore {
        self.counter_store.as_ref()
    }

    /// Get the catalog store
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    pub(crate) fn ledger_store_arc(&self) -> Arc<dyn LikeLedgerStore> {
        Arc::clone(&self.ledger_store)
    }

    pub(crate) fn counter_store_arc(&self) -> Arc<dyn CounterStore> {
        Arc::clone(&self.counter_store)
    }

    pub(crate) fn catalog_arc(&self) -> Arc<dyn CatalogStore> {
        Arc::clone(&self.catalog)
    }

    // === Resilience ===

    /// Get the resilient gateway
    pub fn gateway(&self) -> &ResilientGateway {
        self.gateway.as_ref()
    }

    pub(crate) fn gateway_arc(&self) -> Arc<ResilientGateway> {
        Arc::clone(&self.gateway)
    }

    // === Cache ===

    /// Get the ranking cache
    pub fn ranking_cache(&self) -> &Arc<RankingCache> {
        &self.ranking_cache
    }

    // === Background maintenance ===

    /// Get the reconciliation signal
    pub fn signal(&self) -> &ReconcileSignal {
        &self.signal
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("stores", &"...")
            .field("gateway", &self.gateway)
            .field("ranking_cache", &self.ranking_cache)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    ledger_store: Option<Arc<dyn LikeLedgerStore>>,
    counter_store: Option<Arc<dyn CounterStore>>,
    catalog: Option<Arc<dyn CatalogStore>>,
    resilience: Option<ResilienceConfig>,
    ranking_cache: Option<Arc<RankingCache>>,
    settings: Option<EngineSettings>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger_store(mut self, store: Arc<dyn LikeLedgerStore>) -> Self {
        self.ledger_store = Some(store);
        self
    }

    pub fn counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.counter_store = Some(store);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn resilience(mut self, config: ResilienceConfig) -> Self {
        self.resilience = Some(config);
        self
    }

    pub fn ranking_cache(mut self, cache: Arc<RankingCache>) -> Self {
        self.ranking_cache = Some(cache);
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any storage port is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let resilience = self.resilience.unwrap_or_default();
        Ok(ServiceContext::new(
            self.ledger_store
                .ok_or_else(|| ServiceError::validation("ledger_store is required"))?,
            self.counter_store
                .ok_or_else(|| ServiceError::validation("counter_store is required"))?,
            self.catalog
                .ok_or_else(|| ServiceError::validation("catalog is required"))?,
            Arc::new(ResilientGateway::new(&resilience)),
            self.ranking_cache.unwrap_or_default(),
            self.settings.unwrap_or_default(),
        ))
    }
}
