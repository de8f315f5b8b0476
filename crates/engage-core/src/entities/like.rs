//! Like entities - per-user like records and per-product aggregate counts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{ProductId, UserId};

/// An active like held by one user on one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeRecord {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

impl LikeRecord {
    /// Create a new LikeRecord stamped with the current time
    pub fn new(user_id: UserId, product_id: ProductId) -> Self {
        Self {
            user_id,
            product_id,
            created_at: Utc::now(),
        }
    }
}

/// Authoritative like count for a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeCount {
    pub product_id: ProductId,
    pub count: u64,
    /// Bumped by every successful delta, used to order cache updates
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl LikeCount {
    /// A product nobody has liked yet
    pub fn zero(product_id: ProductId) -> Self {
        Self {
            product_id,
            count: 0,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Like state of a (user, product) pair after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LikeState {
    Activated,
    Deactivated,
}

impl LikeState {
    /// Map an "is liked" flag to a state
    #[inline]
    pub const fn from_active(active: bool) -> Self {
        if active {
            Self::Activated
        } else {
            Self::Deactivated
        }
    }

    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Counter delta produced by entering this state
    #[inline]
    pub const fn delta(self) -> CounterDelta {
        match self {
            Self::Activated => CounterDelta::Increment,
            Self::Deactivated => CounterDelta::Decrement,
        }
    }
}

impl fmt::Display for LikeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated => write!(f, "ACTIVATED"),
            Self::Deactivated => write!(f, "DEACTIVATED"),
        }
    }
}

/// What the caller asked the ledger to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeAction {
    /// Set the pair active; no-op if already active
    Like,
    /// Set the pair inactive; no-op if already inactive
    Unlike,
    /// Flip the current state
    Toggle,
}

impl LikeAction {
    /// Target state given the state observed before the write
    #[inline]
    pub const fn target(self, currently_active: bool) -> LikeState {
        match self {
            Self::Like => LikeState::Activated,
            Self::Unlike => LikeState::Deactivated,
            Self::Toggle => LikeState::from_active(!currently_active),
        }
    }
}

impl fmt::Display for LikeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => write!(f, "like"),
            Self::Unlike => write!(f, "unlike"),
            Self::Toggle => write!(f, "toggle"),
        }
    }
}

/// Outcome of a ledger action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub applied: LikeState,
    /// True when the pair was already in the requested state
    pub noop: bool,
}

impl ToggleOutcome {
    /// The counter delta this outcome must produce, if any
    #[inline]
    pub const fn delta(&self) -> Option<CounterDelta> {
        if self.noop {
            None
        } else {
            Some(self.applied.delta())
        }
    }
}

/// Unit delta applied to a product counter by foreground traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterDelta {
    Increment,
    Decrement,
}

impl CounterDelta {
    #[inline]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }
}

/// Result of an atomic counter update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaOutcome {
    pub count: LikeCount,
    /// The delta would have made the count negative and was clamped to zero
    pub clamped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_targets() {
        assert_eq!(LikeAction::Like.target(true), LikeState::Activated);
        assert_eq!(LikeAction::Like.target(false), LikeState::Activated);
        assert_eq!(LikeAction::Unlike.target(true), LikeState::Deactivated);
        assert_eq!(LikeAction::Toggle.target(true), LikeState::Deactivated);
        assert_eq!(LikeAction::Toggle.target(false), LikeState::Activated);
    }

    #[test]
    fn test_outcome_delta() {
        let applied = ToggleOutcome {
            applied: LikeState::Activated,
            noop: false,
        };
        assert_eq!(applied.delta(), Some(CounterDelta::Increment));

        let noop = ToggleOutcome {
            applied: LikeState::Deactivated,
            noop: true,
        };
        assert_eq!(noop.delta(), None);
        assert_eq!(LikeState::Deactivated.delta().as_i64(), -1);
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&LikeState::Activated).unwrap(),
            "\"ACTIVATED\""
        );
        assert_eq!(LikeState::Deactivated.to_string(), "DEACTIVATED");
    }
}
