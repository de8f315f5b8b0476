//! Resilient gateway - one timeout, retry and circuit breaker policy set per
//! storage dependency.
//!
//! Every attempt first asks the dependency's breaker for a permit, then runs
//! under the per-attempt timeout. Only transient failures (unavailable,
//! timed out) count against the breaker and are retried; domain outcomes such
//! as "not found" mean the dependency answered.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use engage_common::ResilienceConfig;
use engage_core::{DomainError, RepoResult};

use super::circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
use super::retry::RetryPolicy;

/// Storage dependencies guarded by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    Ledger,
    Counter,
    Catalog,
}

impl Dependency {
    pub const ALL: [Dependency; 3] = [Dependency::Ledger, Dependency::Counter, Dependency::Catalog];

    const fn slot(self) -> usize {
        match self {
            Self::Ledger => 0,
            Self::Counter => 1,
            Self::Catalog => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::Counter => "counter",
            Self::Catalog => "catalog",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timeout, retry and circuit breaker wrapper around store calls
#[derive(Debug)]
pub struct ResilientGateway {
    breakers: [CircuitBreaker; 3],
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl ResilientGateway {
    pub fn new(config: &ResilienceConfig) -> Self {
        let breaker = |dep: Dependency| CircuitBreaker::new(dep.as_str(), config.circuit.clone());
        Self {
            breakers: Dependency::ALL.map(breaker),
            retry: RetryPolicy::from(&config.retry),
            attempt_timeout: config.store_timeout,
        }
    }

    pub fn breaker(&self, dependency: Dependency) -> &CircuitBreaker {
        &self.breakers[dependency.slot()]
    }

    pub fn circuit_state(&self, dependency: Dependency) -> CircuitState {
        self.breaker(dependency).state()
    }

    /// Whether the dependency would currently reject calls
    pub fn is_open(&self, dependency: Dependency) -> bool {
        self.circuit_state(dependency) == CircuitState::Open
    }

    /// Snapshots of every breaker, in dependency order
    pub fn circuit_states(&self) -> Vec<CircuitSnapshot> {
        self.breakers.iter().map(CircuitBreaker::snapshot).collect()
    }

    /// Call a store through the dependency's policy set.
    ///
    /// Returns `Degraded` when the breaker rejects the attempt and `Timeout`
    /// when an attempt exceeds the per-attempt timeout. Dropping the returned
    /// future cancels the in-flight attempt.
    pub async fn call<T, F, Fut>(
        &self,
        dependency: Dependency,
        operation: &'static str,
        mut f: F,
    ) -> RepoResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RepoResult<T>>,
    {
        let breaker = self.breaker(dependency);

        self.retry
            .run(operation, DomainError::is_transient, || {
                let attempt = f();
                async move {
                    let permit = match breaker.try_acquire() {
                        Ok(permit) => permit,
                        Err(rejected) => {
                            return Err(DomainError::Degraded(format!(
                                "{dependency} circuit is {}",
                                rejected.state
                            )));
                        }
                    };

                    let result = match timeout(self.attempt_timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(
                                dependency = %dependency,
                                operation,
                                timeout_ms = self.attempt_timeout.as_millis() as u64,
                                "Store call timed out"
                            );
                            Err(DomainError::Timeout(format!("{dependency} {operation}")))
                        }
                    };

                    permit.record(!matches!(&result, Err(err) if err.is_transient()));
                    result
                }
            })
            .await
    }
}
