//! Repository traits (ports)

mod repositories;

pub use repositories::{CatalogStore, CounterStore, LikeLedgerStore, RepoResult};
