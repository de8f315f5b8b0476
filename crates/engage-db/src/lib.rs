//! # engage-db
//!
//! Storage layer implementing the engage-core ports.
//!
//! ## Overview
//!
//! - PostgreSQL adapters via SQLx: the like ledger (`product_likes`), the
//!   authoritative counters (`like_summary`) and the read-only catalog
//! - In-memory adapters backed by `dashmap` for the `memory` backend and tests
//! - Connection pool management and schema bootstrap
//!
//! ## Usage
//!
//! ```rust,ignore
//! use engage_db::pool::{create_pool, ensure_schema, DatabaseConfig};
//! use engage_db::repositories::PgLikeLedger;
//! use engage_core::traits::LikeLedgerStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     ensure_schema(&pool).await?;
//!     let ledger = PgLikeLedger::new(pool);
//!
//!     // Use the ledger...
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{MemoryCatalog, MemoryCounterStore, MemoryLikeLedger};
pub use pool::{create_pool, ensure_schema, DatabaseConfig, PgPool};
pub use repositories::{PgCatalogStore, PgCounterStore, PgLikeLedger};
