//! Count-based circuit breaker.
//!
//! The breaker state is an explicit enum driven by a fixed transition table.
//! A caller takes a [`CallPermit`] before touching the dependency and reports
//! the outcome through it. A permit dropped without a report (the caller's
//! future was cancelled) hands its half-open trial slot back.
//!
//! States:
//! - Closed: calls pass through, outcomes fill a rolling window
//! - Open: calls are rejected until the cooldown elapses
//! - HalfOpen: a bounded number of trial calls decide between Closed and Open

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use engage_common::CircuitSettings;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Inputs that can move the breaker between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitEvent {
    /// The window holds enough calls and its failure rate reached the threshold
    FailureRateExceeded,
    CooldownElapsed,
    /// Every admitted trial call succeeded
    TrialsSucceeded,
    TrialFailed,
}

/// Every legal transition; anything else leaves the state unchanged
pub const TRANSITIONS: [(CircuitState, CircuitEvent, CircuitState); 4] = [
    (
        CircuitState::Closed,
        CircuitEvent::FailureRateExceeded,
        CircuitState::Open,
    ),
    (
        CircuitState::Open,
        CircuitEvent::CooldownElapsed,
        CircuitState::HalfOpen,
    ),
    (
        CircuitState::HalfOpen,
        CircuitEvent::TrialsSucceeded,
        CircuitState::Closed,
    ),
    (
        CircuitState::HalfOpen,
        CircuitEvent::TrialFailed,
        CircuitState::Open,
    ),
];

/// Look up the state an event leads to
pub fn next_state(from: CircuitState, event: CircuitEvent) -> Option<CircuitState> {
    TRANSITIONS
        .iter()
        .find(|(state, ev, _)| *state == from && *ev == event)
        .map(|(_, _, to)| *to)
}

/// The breaker refused the call without attempting it
#[derive(Debug, Clone, Error)]
#[error("circuit '{circuit}' is {state}, call rejected")]
pub struct Rejected {
    pub circuit: String,
    pub state: CircuitState,
}

/// Point-in-time view of a breaker, for health reporting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    /// Failure rate over the current window
    pub failure_rate: f64,
    pub calls_total: u64,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
}

struct BreakerInner {
    state: CircuitState,
    /// Most recent closed-state outcomes, `true` for a failure
    window: VecDeque<bool>,
    window_failures: usize,
    opened_at: Option<Instant>,
    trials_admitted: u32,
    trials_succeeded: u32,
    /// Bumped on every transition; outcomes reported by older permits are dropped
    epoch: u64,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            window_failures: 0,
            opened_at: None,
            trials_admitted: 0,
            trials_succeeded: 0,
            epoch: 0,
        }
    }

    fn push_outcome(&mut self, failed: bool, window_size: usize) {
        self.window.push_back(failed);
        if failed {
            self.window_failures += 1;
        }
        while self.window.len() > window_size {
            if self.window.pop_front() == Some(true) {
                self.window_failures -= 1;
            }
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window_failures as f64 / self.window.len() as f64
    }
}

/// A named circuit breaker with metrics tracking
pub struct CircuitBreaker {
    name: String,
    settings: CircuitSettings,
    inner: Mutex<BreakerInner>,

    // Metrics
    calls_total: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
}

impl CircuitBreaker {
    /// Create a closed breaker
    pub fn new(name: impl Into<String>, settings: CircuitSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerInner::new()),
            calls_total: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, moving Open to HalfOpen if the cooldown has elapsed
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.poll_cooldown(&mut inner);
        inner.state
    }

    /// Ask to make one call against the dependency
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, Rejected> {
        self.calls_total.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.lock();
        self.poll_cooldown(&mut inner);

        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, inner.epoch, false)),
            CircuitState::HalfOpen if inner.trials_admitted < self.settings.half_open_trials => {
                inner.trials_admitted += 1;
                debug!(
                    circuit = %self.name,
                    trial = inner.trials_admitted,
                    "Admitting half-open trial call"
                );
                Ok(CallPermit::new(self, inner.epoch, true))
            }
            state => {
                drop(inner);
                self.rejections.fetch_add(1, Ordering::Relaxed);
                debug!(circuit = %self.name, state = %state, "Circuit breaker rejected call");
                Err(Rejected {
                    circuit: self.name.clone(),
                    state,
                })
            }
        }
    }

    /// Snapshot for health reporting
    pub fn snapshot(&self) -> CircuitSnapshot {
        let (state, failure_rate) = {
            let mut inner = self.inner.lock();
            self.poll_cooldown(&mut inner);
            (inner.state, inner.failure_rate())
        };
        CircuitSnapshot {
            name: self.name.clone(),
            state,
            failure_rate,
            calls_total: self.calls_total(),
            successes: self.successes(),
            failures: self.failures(),
            rejections: self.rejections(),
        }
    }

    /// Get total number of calls, rejected ones included
    pub fn calls_total(&self) -> u64 {
        self.calls_total.load(Ordering::Relaxed)
    }

    /// Get number of successful calls
    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    /// Get number of failed calls
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Get number of rejected calls
    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }

    fn poll_cooldown(&self, inner: &mut BreakerInner) {
        let cooled = inner.state == CircuitState::Open
            && inner
                .opened_at
                .is_some_and(|at| at.elapsed() >= self.settings.cooldown);
        if cooled {
            self.transition(inner, CircuitEvent::CooldownElapsed);
        }
    }

    fn on_outcome(&self, epoch: u64, trial: bool, success: bool) {
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.push_outcome(!success, self.settings.window_size);
                let minimum = self.settings.minimum_calls.min(self.settings.window_size);
                if inner.window.len() >= minimum
                    && inner.failure_rate() >= self.settings.failure_rate_threshold
                {
                    self.transition(&mut inner, CircuitEvent::FailureRateExceeded);
                }
            }
            CircuitState::HalfOpen if trial => {
                if success {
                    inner.trials_succeeded += 1;
                    if inner.trials_succeeded >= self.settings.half_open_trials {
                        self.transition(&mut inner, CircuitEvent::TrialsSucceeded);
                    }
                } else {
                    self.transition(&mut inner, CircuitEvent::TrialFailed);
                }
            }
            _ => {}
        }
    }

    fn release_trial(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch == epoch && inner.state == CircuitState::HalfOpen {
            inner.trials_admitted = inner.trials_admitted.saturating_sub(1);
            debug!(circuit = %self.name, "Abandoned trial call released its slot");
        }
    }

    fn transition(&self, inner: &mut BreakerInner, event: CircuitEvent) {
        let from = inner.state;
        let Some(to) = next_state(from, event) else {
            debug!(circuit = %self.name, state = %from, ?event, "Ignoring event with no transition");
            return;
        };

        inner.state = to;
        inner.epoch += 1;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                warn!(
                    circuit = %self.name,
                    from = %from,
                    failure_rate = inner.failure_rate(),
                    cooldown_ms = self.settings.cooldown.as_millis() as u64,
                    "Circuit opened"
                );
            }
            CircuitState::HalfOpen => {
                inner.trials_admitted = 0;
                inner.trials_succeeded = 0;
                info!(circuit = %self.name, "Circuit half-open, admitting trial calls");
            }
            CircuitState::Closed => {
                inner.window.clear();
                inner.window_failures = 0;
                inner.opened_at = None;
                info!(circuit = %self.name, "Circuit closed");
            }
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.inner.lock().state)
            .finish()
    }
}

/// Admission for one call; report the outcome with [`CallPermit::record`]
#[must_use = "report the call outcome with `record`"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    epoch: u64,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, epoch: u64, trial: bool) -> Self {
        Self {
            breaker,
            epoch,
            trial,
            settled: false,
        }
    }

    /// Whether this permit holds a half-open trial slot
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Report whether the dependency behaved
    pub fn record(mut self, success: bool) {
        self.settled = true;
        self.breaker.on_outcome(self.epoch, self.trial, success);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial(self.epoch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    fn settings() -> CircuitSettings {
        CircuitSettings {
            failure_rate_threshold: 0.5,
            window_size: 10,
            minimum_calls: 4,
            cooldown: Duration::from_secs(1),
            half_open_trials: 2,
        }
    }

    fn call(cb: &CircuitBreaker, success: bool) {
        cb.try_acquire().unwrap().record(success);
    }

    fn trip(cb: &CircuitBreaker) {
        for _ in 0..4 {
            call(cb, false);
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_transition_table() {
        use CircuitEvent::*;
        use CircuitState::*;

        assert_eq!(next_state(Closed, FailureRateExceeded), Some(Open));
        assert_eq!(next_state(Open, CooldownElapsed), Some(HalfOpen));
        assert_eq!(next_state(HalfOpen, TrialsSucceeded), Some(Closed));
        assert_eq!(next_state(HalfOpen, TrialFailed), Some(Open));

        assert_eq!(next_state(Closed, CooldownElapsed), None);
        assert_eq!(next_state(Open, TrialFailed), None);
        assert_eq!(next_state(Open, FailureRateExceeded), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_closed_below_minimum_calls() {
        let cb = CircuitBreaker::new("ledger", settings());

        for _ in 0..3 {
            call(&cb, false);
        }

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failures(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_when_failure_rate_reaches_threshold() {
        let cb = CircuitBreaker::new("ledger", settings());

        call(&cb, true);
        call(&cb, true);
        call(&cb, false);
        assert_eq!(cb.state(), CircuitState::Closed);

        call(&cb, false);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_forgets_old_failures() {
        let cb = CircuitBreaker::new(
            "counter",
            CircuitSettings {
                window_size: 4,
                minimum_calls: 4,
                ..settings()
            },
        );

        call(&cb, false);
        for _ in 0..4 {
            call(&cb, true);
        }
        // Window is now four successes; one more failure is 25%
        call(&cb, false);

        assert_eq!(cb.state(), CircuitState::Closed);
        assert!((cb.snapshot().failure_rate - 0.25).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_calling() {
        let cb = CircuitBreaker::new("ledger", settings());
        trip(&cb);

        let err = cb.try_acquire().err().unwrap();
        assert_eq!(err.state, CircuitState::Open);
        assert_eq!(err.circuit, "ledger");
        assert_eq!(cb.rejections(), 1);
        assert_eq!(cb.successes() + cb.failures(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_exactly_configured_trials() {
        let cb = CircuitBreaker::new("ledger", settings());
        trip(&cb);

        advance(Duration::from_millis(999)).await;
        assert!(cb.try_acquire().is_err());

        advance(Duration::from_millis(1)).await;
        let first = cb.try_acquire().unwrap();
        let second = cb.try_acquire().unwrap();
        assert!(first.is_trial() && second.is_trial());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.try_acquire().is_err());

        first.record(true);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        second.record(true);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens() {
        let cb = CircuitBreaker::new("catalog", settings());
        trip(&cb);
        advance(Duration::from_secs(1)).await;

        let good = cb.try_acquire().unwrap();
        let bad = cb.try_acquire().unwrap();
        bad.record(false);
        assert_eq!(cb.state(), CircuitState::Open);

        // The surviving trial belongs to the previous half-open period
        good.record(true);
        assert_eq!(cb.state(), CircuitState::Open);

        advance(Duration::from_secs(1)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_releases_slot() {
        let cb = CircuitBreaker::new("ledger", settings());
        trip(&cb);
        advance(Duration::from_secs(1)).await;

        let kept = cb.try_acquire().unwrap();
        drop(cb.try_acquire().unwrap());

        let replacement = cb.try_acquire().unwrap();
        kept.record(true);
        replacement.record(true);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_starts_a_fresh_window() {
        let cb = CircuitBreaker::new("ledger", settings());
        trip(&cb);
        advance(Duration::from_secs(1)).await;
        call(&cb, true);
        call(&cb, true);
        assert_eq!(cb.state(), CircuitState::Closed);

        for _ in 0..3 {
            call(&cb, false);
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_snapshot_serialization() {
        let cb = CircuitBreaker::new("counter", settings());
        let json = serde_json::to_value(cb.snapshot()).unwrap();
        assert_eq!(json["state"], "CLOSED");
        assert_eq!(json["name"], "counter");
    }
}
