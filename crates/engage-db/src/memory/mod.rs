//! In-memory adapters for the storage ports
//!
//! Used by the `memory` storage backend and as fakes in tests.

mod catalog;
mod counter;
mod like_ledger;

pub use catalog::MemoryCatalog;
pub use counter::MemoryCounterStore;
pub use like_ledger::MemoryLikeLedger;
