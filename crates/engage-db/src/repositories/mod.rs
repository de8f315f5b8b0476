//! Repository implementations
//!
//! PostgreSQL implementations of the storage ports defined in engage-core.

mod catalog;
mod counter;
mod error;
mod like_ledger;

pub use catalog::PgCatalogStore;
pub use counter::PgCounterStore;
pub use error::map_db_error;
pub use like_ledger::PgLikeLedger;
