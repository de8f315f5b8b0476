//! Database models - SQLx-compatible structs for PostgreSQL tables

mod like;
mod product;

pub use like::{LikeModel, LikeSummaryDeltaModel, LikeSummaryModel, ProductLikeCountModel};
pub use product::{BrandModel, ProductModel};
