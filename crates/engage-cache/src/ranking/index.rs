//! Ordered index for one sort key

use std::collections::{BTreeSet, HashMap};

use engage_core::entities::RankingEntry;
use engage_core::value_objects::{BrandId, ProductId, SortKey};

/// Index position: ascending rank, ties by ascending product id
pub(crate) type IndexKey = (i64, ProductId);

/// One ordered index over every cached entry, plus a sub-index per brand
#[derive(Debug, Default)]
pub(crate) struct SortIndex {
    all: BTreeSet<IndexKey>,
    by_brand: HashMap<BrandId, BTreeSet<IndexKey>>,
}

impl SortIndex {
    /// Build the index for `key` over `entries`
    pub(crate) fn build<'a>(key: SortKey, entries: impl IntoIterator<Item = &'a RankingEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.insert(entry.brand_id, (key.rank(entry), entry.product_id));
        }
        index
    }

    pub(crate) fn insert(&mut self, brand: BrandId, position: IndexKey) {
        self.all.insert(position);
        self.by_brand.entry(brand).or_default().insert(position);
    }

    pub(crate) fn remove(&mut self, brand: BrandId, position: &IndexKey) {
        self.all.remove(position);
        if let Some(set) = self.by_brand.get_mut(&brand) {
            set.remove(position);
            if set.is_empty() {
                self.by_brand.remove(&brand);
            }
        }
    }

    /// Move an entry from one rank to another
    pub(crate) fn reposition(&mut self, brand: BrandId, product_id: ProductId, from: i64, to: i64) {
        if from == to {
            return;
        }
        self.remove(brand, &(from, product_id));
        self.insert(brand, (to, product_id));
    }

    /// The ordered set for an optional brand filter
    pub(crate) fn scope(&self, brand: Option<BrandId>) -> Option<&BTreeSet<IndexKey>> {
        match brand {
            Some(brand) => self.by_brand.get(&brand),
            None => Some(&self.all),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.all.len()
    }
}
