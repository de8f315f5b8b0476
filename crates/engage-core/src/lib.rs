//! # engage-core
//!
//! Domain layer containing entities, value objects, errors and storage ports
//! for product likes and ranked listings.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Brand, CatalogProduct, CounterDelta, DeltaOutcome, LikeAction, LikeCount, LikeRecord,
    LikeState, RankingEntry, ToggleOutcome,
};
pub use error::DomainError;
pub use traits::{CatalogStore, CounterStore, LikeLedgerStore, RepoResult};
pub use value_objects::{BrandId, IdParseError, ProductId, SortKey, UserId};
