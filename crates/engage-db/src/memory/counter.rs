//! In-memory implementation of CounterStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::debug;

use engage_core::entities::{CounterDelta, DeltaOutcome, LikeCount};
use engage_core::traits::{CounterStore, RepoResult};
use engage_core::value_objects::ProductId;

/// Bits of the packed word holding the count; the rest hold the version.
///
/// Counts saturate at 2^26 - 1 (about 67 million likes per product) and the
/// version wraps only after 2^38 deltas on one product.
const COUNT_BITS: u32 = 26;
const COUNT_MASK: u64 = (1 << COUNT_BITS) - 1;
const VERSION_MASK: u64 = (1 << (u64::BITS - COUNT_BITS)) - 1;

/// Count in the low bits, version in the high bits, so both change in one CAS
#[inline]
fn pack(count: u64, version: u64) -> u64 {
    (version << COUNT_BITS) | (count & COUNT_MASK)
}

#[inline]
fn unpack(packed: u64) -> (u64, u64) {
    (packed & COUNT_MASK, packed >> COUNT_BITS)
}

/// Apply a signed delta to a packed cell value, clamping at zero.
/// Returns the next packed value and whether the delta was clamped.
fn step(packed: u64, delta: i64) -> (u64, bool) {
    let (count, version) = unpack(packed);
    let raw = i64::try_from(count).unwrap_or(i64::MAX).saturating_add(delta);
    let clamped = raw < 0;
    let next = u64::try_from(raw).unwrap_or(0).min(COUNT_MASK);
    (pack(next, version.wrapping_add(1) & VERSION_MASK), clamped)
}

#[derive(Debug)]
struct CounterCell {
    packed: AtomicU64,
    updated_at_micros: AtomicI64,
}

impl CounterCell {
    fn new() -> Self {
        Self {
            packed: AtomicU64::new(0),
            updated_at_micros: AtomicI64::new(Utc::now().timestamp_micros()),
        }
    }

    fn updated_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.updated_at_micros.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    fn read(&self, product_id: ProductId) -> LikeCount {
        let (count, version) = unpack(self.packed.load(Ordering::Acquire));
        LikeCount {
            product_id,
            count,
            version,
            updated_at: self.updated_at(),
        }
    }
}

/// Like counters held as one packed atomic per product
///
/// Deltas are CAS loops on the packed word; no lock is held across an
/// update.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    cells: DashMap<ProductId, CounterCell>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, product_id: ProductId, delta: i64) -> DeltaOutcome {
        // Fast path takes only the shard read lock
        let cell = match self.cells.get(&product_id) {
            Some(cell) => cell,
            None => self
                .cells
                .entry(product_id)
                .or_insert_with(CounterCell::new)
                .downgrade(),
        };

        let mut clamped = false;
        let previous = cell
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
                let (next, was_clamped) = step(packed, delta);
                clamped = was_clamped;
                Some(next)
            })
            .unwrap_or_else(|packed| packed);
        let (next, _) = step(previous, delta);
        cell.updated_at_micros
            .store(Utc::now().timestamp_micros(), Ordering::Relaxed);

        let (count, version) = unpack(next);
        debug!(product_id = %product_id, delta, count, version, clamped, "Counter delta applied");

        DeltaOutcome {
            count: LikeCount {
                product_id,
                count,
                version,
                updated_at: cell.updated_at(),
            },
            clamped,
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn apply_delta(
        &self,
        product_id: ProductId,
        delta: CounterDelta,
    ) -> RepoResult<DeltaOutcome> {
        Ok(self.apply(product_id, delta.as_i64()))
    }

    async fn compensate(&self, product_id: ProductId, delta: i64) -> RepoResult<DeltaOutcome> {
        Ok(self.apply(product_id, delta))
    }

    async fn get_count(&self, product_id: ProductId) -> RepoResult<LikeCount> {
        Ok(self
            .cells
            .get(&product_id)
            .map_or_else(|| LikeCount::zero(product_id), |cell| cell.read(product_id)))
    }

    async fn snapshot(&self) -> RepoResult<Vec<LikeCount>> {
        Ok(self
            .cells
            .iter()
            .map(|entry| entry.value().read(*entry.key()))
            .collect())
    }
}
