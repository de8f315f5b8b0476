//! Business logic services
//!
//! This module contains the like workflow, the ledger front end, the
//! ranking projection source and the background reconciler.

pub mod context;
pub mod engagement;
pub mod error;
pub mod ledger;
pub mod projection;
pub mod reconciler;

// Re-export all services for convenience
pub use context::{EngineSettings, ServiceContext, ServiceContextBuilder};
pub use engagement::{
    EngagementService, LikeCountView, LikeResult, LikedProduct, ListedProduct, ListingPage,
    ListingQuery, ProductDetail, RequestStage,
};
pub use error::{ServiceError, ServiceResult};
pub use ledger::LikeLedger;
pub use projection::StoreRankingSource;
pub use reconciler::{ReconcileReport, ReconcileSignal, Reconciler};
