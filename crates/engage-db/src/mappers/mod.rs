//! Entity to model mappers
//!
//! `TryFrom<Model> for Entity` conversions from database rows to domain
//! objects. Rows with identifiers the domain rejects surface as storage
//! errors instead of panics.

mod like;
mod product;

pub(crate) use like::{corrupt_row, to_u64};
