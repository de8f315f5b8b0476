//! Listing sort orders
//!
//! Every sort order is reduced to a single signed "rank" value that sorts
//! ascending; descending orders negate the attribute. Ties are broken by
//! ascending product id, so an index key is `(rank, ProductId)`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::RankingEntry;

/// Sort order for product listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortKey {
    LikesDesc,
    PriceAsc,
    PriceDesc,
    #[default]
    RecencyDesc,
}

/// Rank function for one sort order
type RankFn = fn(&RankingEntry) -> i64;

/// One rank strategy per variant, indexed by [`SortKey::slot`]
const RANK_STRATEGIES: [RankFn; SortKey::COUNT] = [
    |entry| -saturating_i64(entry.like_count),
    |entry| entry.price,
    |entry| -entry.price,
    |entry| -entry.created_at.timestamp_micros(),
];

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl SortKey {
    /// Number of sort orders
    pub const COUNT: usize = 4;

    /// All sort orders, in slot order
    pub const ALL: [SortKey; SortKey::COUNT] = [
        SortKey::LikesDesc,
        SortKey::PriceAsc,
        SortKey::PriceDesc,
        SortKey::RecencyDesc,
    ];

    /// Stable array position for per-key tables
    #[inline]
    pub const fn slot(self) -> usize {
        match self {
            Self::LikesDesc => 0,
            Self::PriceAsc => 1,
            Self::PriceDesc => 2,
            Self::RecencyDesc => 3,
        }
    }

    /// Ascending rank of an entry under this order
    #[inline]
    pub fn rank(self, entry: &RankingEntry) -> i64 {
        RANK_STRATEGIES[self.slot()](entry)
    }

    /// Query-string name (`latest`, `likes_desc`, `price_asc`, `price_desc`)
    pub const fn as_query_str(self) -> &'static str {
        match self {
            Self::LikesDesc => "likes_desc",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::RecencyDesc => "latest",
        }
    }

    /// Parse a query-string sort name
    pub fn from_query_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "recency_desc" => Some(Self::RecencyDesc),
            "likes_desc" => Some(Self::LikesDesc),
            "price_asc" => Some(Self::PriceAsc),
            "price_desc" => Some(Self::PriceDesc),
            _ => None,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_str())
    }
}
