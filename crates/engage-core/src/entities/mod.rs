//! Domain entities - core business objects

mod like;
mod product;

pub use like::{
    CounterDelta, DeltaOutcome, LikeAction, LikeCount, LikeRecord, LikeState, ToggleOutcome,
};
pub use product::{Brand, CatalogProduct, RankingEntry};
