//! Ranking cache: ordered, filterable listings over the like projection

mod cache;
mod index;

pub use cache::{
    CacheState, CountUpdate, Freshness, RankingCache, RankingPage, RankingSource, RebuildSummary,
};
