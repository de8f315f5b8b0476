//! Value objects - immutable types that represent domain concepts

mod ids;
mod sort_key;

pub use ids::{BrandId, IdParseError, ProductId, UserId};
pub use sort_key::SortKey;
