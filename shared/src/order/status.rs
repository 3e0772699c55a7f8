//! Order status state machine
//!
//! ```text
//! PENDING ──▶ PREPARING ──▶ READY ──▶ COMPLETED
//!    │
//!    └──▶ PAYMENT_FAILED (terminal)
//! ```
//!
//! Transitions are monotonic: there are no backward moves and no state
//! skipping. Both the server (when recording a transition) and the client
//! (when merging feed events) rely on the same relation, which is why it
//! lives here rather than in the server crate.

use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Completed,
    PaymentFailed,
}

/// Outcome of applying a target status to a current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The status changed
    Applied,
    /// Target equals current - idempotent no-op, not an error
    NoOp,
}

/// Rejected status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Check if this is a terminal state (no further transitions)
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::PaymentFailed)
    }

    /// The legal transition relation
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Pending, PaymentFailed)
                | (Preparing, Ready)
                | (Ready, Completed)
        )
    }

    /// Validate a target status against the current one
    ///
    /// Re-applying the status that already holds is a no-op success, so
    /// retried staff actions and duplicated payment callbacks do not fail.
    pub fn apply(self, next: OrderStatus) -> Result<TransitionOutcome, InvalidTransition> {
        if self == next {
            return Ok(TransitionOutcome::NoOp);
        }
        if self.can_transition_to(next) {
            Ok(TransitionOutcome::Applied)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Monotonic merge position
    ///
    /// Total order consistent with both legal chains; a record never moves
    /// to a lower rank, so replaying a stale feed event cannot walk an
    /// order backward. Pairs outside the transition relation (e.g.
    /// COMPLETED vs PAYMENT_FAILED) are never recorded for the same order,
    /// so their relative rank is only there to keep the merge total.
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Completed => 3,
            OrderStatus::PaymentFailed => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain_is_legal() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::PaymentFailed));
    }

    #[test]
    fn test_no_backward_or_skipping_moves() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::PaymentFailed));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            assert!(!OrderStatus::Completed.can_transition_to(next));
            assert!(!OrderStatus::PaymentFailed.can_transition_to(next));
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        assert_eq!(
            OrderStatus::Preparing.apply(OrderStatus::Preparing),
            Ok(TransitionOutcome::NoOp)
        );
        assert_eq!(
            OrderStatus::Completed.apply(OrderStatus::Completed),
            Ok(TransitionOutcome::NoOp)
        );
    }

    #[test]
    fn test_apply_rejects_illegal_target() {
        let err = OrderStatus::Pending.apply(OrderStatus::Ready).unwrap_err();
        assert_eq!(err.from, OrderStatus::Pending);
        assert_eq!(err.to, OrderStatus::Ready);
    }

    #[test]
    fn test_rank_is_monotonic_along_transitions() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::PaymentFailed,
        ] {
            for to in [
                OrderStatus::Pending,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Completed,
                OrderStatus::PaymentFailed,
            ] {
                if from.can_transition_to(to) {
                    assert!(to.rank() > from.rank(), "{from:?} -> {to:?}");
                }
            }
        }
    }
}
