//! # engage-service
//!
//! Application layer: the like workflow, ranked listings, resilience policies,
//! background reconciliation and the DTOs exposed over HTTP.

pub mod dto;
pub mod resilience;
pub mod services;

pub use resilience::{CircuitSnapshot, CircuitState, Dependency, ResilientGateway};
pub use services::{
    EngagementService, EngineSettings, ReconcileReport, Reconciler, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult,
};
