//! Axum extractors for request handling
//!
//! Custom extractors for caller identity, path identifiers and listing queries.

mod identity;
mod listing;
mod path;

pub use identity::{CallerId, USER_ID_HEADER};
pub use listing::Listing;
pub use path::ProductPath;
