//! Resilience policies for storage calls
//!
//! - Circuit breaker: per-dependency protection with an explicit state table
//! - Retry: capped exponential backoff for transient failures
//! - Gateway: composes both with a per-attempt timeout

pub mod circuit_breaker;
pub mod gateway;
pub mod retry;

pub use circuit_breaker::{
    next_state, CallPermit, CircuitBreaker, CircuitEvent, CircuitSnapshot, CircuitState, Rejected,
    TRANSITIONS,
};
pub use gateway::{Dependency, ResilientGateway};
pub use retry::RetryPolicy;
