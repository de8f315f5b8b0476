//! Consistency reconciler
//!
//! Background pass that recomputes every product's like count from the
//! ledger, corrects counter drift with compensating deltas, repairs ranking
//! cache entries and schedules full cache rebuilds.
//!
//! Passes run on a fixed interval (missed ticks are skipped) and are woken
//! early by a [`ReconcileSignal`]. No lock is held across a store call.
//!
//! A drift is only compensated once two consecutive passes observe the same
//! ledger count and the same counter version. A foreground write sitting
//! between its ledger and counter stages bumps the version when it lands,
//! so it is never compensated on top of its own delta.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use engage_cache::{CacheState, RankingCache};
use engage_common::ReconcilerConfig;
use engage_core::traits::{CounterStore, LikeLedgerStore};
use engage_core::{LikeCount, ProductId, RepoResult};

use crate::resilience::{Dependency, ResilientGateway};

use super::context::ServiceContext;
use super::projection::StoreRankingSource;

/// Wakes the reconciler ahead of its next tick
#[derive(Debug, Clone, Default)]
pub struct ReconcileSignal {
    notify: Arc<Notify>,
}

impl ReconcileSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an early pass; signals raised while a pass runs coalesce
    pub fn raise(&self, reason: &'static str) {
        debug!(reason, "Reconciliation requested");
        self.notify.notify_one();
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub products_checked: usize,
    /// Products whose counter disagreed with the ledger snapshot
    pub drift_detected: usize,
    /// Drifts seen for the first time, held until the next pass confirms them
    pub drift_deferred: usize,
    /// Products whose drift was confirmed and compensated
    pub drift_corrected: usize,
    /// Sum of absolute compensations applied
    pub total_drift: u64,
    pub cache_repairs: usize,
    pub cache_rebuilt: bool,
}

impl ReconcileReport {
    /// Nothing was out of line
    pub fn is_clean(&self) -> bool {
        self.drift_corrected == 0 && self.drift_deferred == 0 && self.cache_repairs == 0
    }
}

/// Ledger count and counter version behind an unconfirmed drift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observation {
    ledger: u64,
    version: u64,
}

enum Correction {
    /// Compensated: the corrected count and the applied |delta|
    Applied(LikeCount, u64),
    /// First sighting, recorded for the next pass
    Deferred(Observation),
    /// Ledger and counter agree on re-read
    Resolved,
}

/// Background drift detector and corrector
pub struct Reconciler {
    ledger: Arc<dyn LikeLedgerStore>,
    counters: Arc<dyn CounterStore>,
    cache: Arc<RankingCache>,
    source: StoreRankingSource,
    gateway: Arc<ResilientGateway>,
    config: ReconcilerConfig,
    rebuild_interval: Duration,
    signal: ReconcileSignal,
    pass_lock: tokio::sync::Mutex<()>,
    suspects: Mutex<HashMap<ProductId, Observation>>,
}

impl Reconciler {
    pub fn new(ctx: &ServiceContext) -> Self {
        Self {
            ledger: ctx.ledger_store_arc(),
            counters: ctx.counter_store_arc(),
            cache: Arc::clone(ctx.ranking_cache()),
            source: StoreRankingSource::new(ctx),
            gateway: ctx.gateway_arc(),
            config: ctx.settings().reconciler.clone(),
            rebuild_interval: ctx.settings().rebuild_interval,
            signal: ctx.signal().clone(),
            pass_lock: tokio::sync::Mutex::new(()),
            suspects: Mutex::new(HashMap::new()),
        }
    }

    /// Run one full pass; concurrent callers queue behind the running pass
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> RepoResult<ReconcileReport> {
        let _pass = self.pass_lock.lock().await;
        let mut report = ReconcileReport::default();

        let ledger = self.ledger.as_ref();
        let counters = self.counters.as_ref();

        let truth = self
            .gateway
            .call(Dependency::Ledger, "active_counts", || ledger.active_counts())
            .await?;
        let mut stored: HashMap<ProductId, LikeCount> = self
            .gateway
            .call(Dependency::Counter, "snapshot", || counters.snapshot())
            .await?
            .into_iter()
            .map(|count| (count.product_id, count))
            .collect();

        let products: BTreeSet<ProductId> = truth.keys().chain(stored.keys()).copied().collect();
        report.products_checked = products.len();

        let mut previous = std::mem::take(&mut *self.suspects.lock());
        for product_id in products {
            let expected = truth.get(&product_id).copied().unwrap_or(0);
            let actual = stored.get(&product_id).map_or(0, |c| c.count);
            if expected != actual {
                report.drift_detected += 1;
                let seen = previous.remove(&product_id);
                match self.correct(product_id, seen).await? {
                    Correction::Applied(count, drift) => {
                        report.drift_corrected += 1;
                        report.total_drift += drift;
                        stored.insert(product_id, count);
                    }
                    Correction::Deferred(observation) => {
                        report.drift_deferred += 1;
                        self.suspects.lock().insert(product_id, observation);
                    }
                    Correction::Resolved => {}
                }
            }
            tokio::task::yield_now().await;
        }

        report.cache_repairs = self.repair_cache(&stored);

        if self.needs_rebuild(&report) {
            match self.cache.rebuild(&self.source).await {
                Ok(summary) => {
                    report.cache_rebuilt = true;
                    debug!(entries = summary.entries, "Reconciler rebuilt ranking cache");
                }
                Err(err) => warn!(error = %err, "Scheduled ranking rebuild failed"),
            }
        }

        Ok(report)
    }

    /// Re-read one product's ledger count and counter. A disagreement is
    /// compensated only when it matches the observation from the last pass.
    async fn correct(
        &self,
        product_id: ProductId,
        seen: Option<Observation>,
    ) -> RepoResult<Correction> {
        let ledger = self.ledger.as_ref();
        let counters = self.counters.as_ref();

        let expected = self
            .gateway
            .call(Dependency::Ledger, "count_for", || ledger.count_for(product_id))
            .await?;
        let current = self
            .gateway
            .call(Dependency::Counter, "get_count", || counters.get_count(product_id))
            .await?;

        let delta = expected as i64 - current.count as i64;
        if delta == 0 {
            debug!(product_id = %product_id, "Drift resolved itself before correction");
            return Ok(Correction::Resolved);
        }

        let observation = Observation {
            ledger: expected,
            version: current.version,
        };
        if seen != Some(observation) {
            debug!(
                product_id = %product_id,
                ledger = expected,
                counter = current.count,
                version = current.version,
                "Drift observed, awaiting confirmation"
            );
            return Ok(Correction::Deferred(observation));
        }

        let outcome = self
            .gateway
            .call(Dependency::Counter, "compensate", || {
                counters.compensate(product_id, delta)
            })
            .await?;

        warn!(
            product_id = %product_id,
            ledger = expected,
            counter = current.count,
            delta,
            corrected = outcome.count.count,
            "DriftCorrected"
        );
        Ok(Correction::Applied(outcome.count, delta.unsigned_abs()))
    }

    /// Overwrite cached counts that disagree with the counter store.
    /// Entries already holding a newer version than the snapshot are left alone.
    fn repair_cache(&self, stored: &HashMap<ProductId, LikeCount>) -> usize {
        let mut repairs = 0;
        for (product_id, (cached_count, cached_version)) in self.cache.cached_counts() {
            let (count, version) = stored
                .get(&product_id)
                .map_or((0, 0), |c| (c.count, c.version));
            if cached_count != count
                && cached_version <= version
                && self.cache.repair_count(product_id, cached_version, count, version)
            {
                debug!(
                    product_id = %product_id,
                    cached = cached_count,
                    counter = count,
                    "Repaired cached like count"
                );
                repairs += 1;
            }
        }
        repairs
    }

    fn needs_rebuild(&self, report: &ReconcileReport) -> bool {
        let threshold = self.config.drift_threshold;
        (threshold > 0 && report.total_drift >= threshold)
            || self.cache.state() == CacheState::Dirty
            || !self.cache.rebuilt_within(self.rebuild_interval)
    }

    /// Run passes until `shutdown` flips to true or its sender is dropped
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                interval_secs = self.config.interval.as_secs(),
                drift_threshold = self.config.drift_threshold,
                "Reconciler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = self.signal.wait() => {
                        debug!("Reconciler woken early");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                match self.run_once().await {
                    Ok(report) if report.is_clean() => {
                        debug!(products = report.products_checked, "Reconcile pass clean");
                    }
                    Ok(report) => {
                        info!(
                            products = report.products_checked,
                            corrected = report.drift_corrected,
                            total_drift = report.total_drift,
                            cache_repairs = report.cache_repairs,
                            cache_rebuilt = report.cache_rebuilt,
                            "Reconcile pass corrected drift"
                        );
                    }
                    Err(err) => warn!(error = %err, "Reconcile pass failed"),
                }
            }

            info!("Reconciler stopped");
        })
    }
}
