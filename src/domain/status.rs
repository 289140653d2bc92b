//! Order lifecycle and payment status machines.
//!
//! Transitions move forward along pending → processing → shipped →
//! delivered; skipping ahead is legal, moving backward is not.
//! `cancelled` is reachable from any state except the terminals.
//! History logging is the caller's single responsibility: exactly one
//! record per transition accepted here.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Position in the fulfilment chain; cancelled sits outside it.
    fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    /// Checks whether `self → next` is a legal transition.
    pub fn validate_transition(self, next: OrderStatus) -> Result<(), TransitionError> {
        use OrderStatus::*;
        if self == next {
            return Err(TransitionError::AlreadyInStatus(self));
        }
        match (self, next) {
            (Delivered, Cancelled) => Err(TransitionError::DeliveredOrdersCannotBeCancelled),
            (Cancelled, to) => Err(TransitionError::IllegalTransition { from: Cancelled, to }),
            (_, Cancelled) => Ok(()),
            (from, to) if to.rank() > from.rank() => Ok(()),
            (from, to) => Err(TransitionError::IllegalTransition { from, to }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Charge outcome reported by the payment-handling collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeOutcome {
    Success,
    Failure,
}

/// Refund reference assigned when a paid order is cancelled.
pub fn refund_reference(order_id: Uuid) -> String {
    format!("REF-{order_id}")
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn forward_transitions_are_legal() {
        assert!(Pending.validate_transition(Processing).is_ok());
        assert!(Processing.validate_transition(Shipped).is_ok());
        assert!(Shipped.validate_transition(Delivered).is_ok());
    }

    #[test]
    fn skipping_ahead_is_legal() {
        assert!(Pending.validate_transition(Shipped).is_ok());
        assert!(Pending.validate_transition(Delivered).is_ok());
        assert!(Processing.validate_transition(Delivered).is_ok());
    }

    #[test]
    fn backward_transitions_are_rejected() {
        assert_eq!(
            Shipped.validate_transition(Processing),
            Err(TransitionError::IllegalTransition { from: Shipped, to: Processing })
        );
        assert_eq!(
            Processing.validate_transition(Pending),
            Err(TransitionError::IllegalTransition { from: Processing, to: Pending })
        );
    }

    #[test]
    fn cancellation_allowed_from_any_non_terminal_state() {
        assert!(Pending.validate_transition(Cancelled).is_ok());
        assert!(Processing.validate_transition(Cancelled).is_ok());
        assert!(Shipped.validate_transition(Cancelled).is_ok());
    }

    #[test]
    fn delivered_orders_cannot_be_cancelled() {
        assert_eq!(
            Delivered.validate_transition(Cancelled),
            Err(TransitionError::DeliveredOrdersCannotBeCancelled)
        );
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Cancelled.validate_transition(Processing).is_err());
        assert!(Delivered.validate_transition(Processing).is_err());
    }

    #[test]
    fn same_status_is_not_a_transition() {
        assert_eq!(
            Pending.validate_transition(Pending),
            Err(TransitionError::AlreadyInStatus(Pending))
        );
    }

    #[test]
    fn refund_reference_derives_from_order_id() {
        let id = Uuid::nil();
        assert_eq!(refund_reference(id), format!("REF-{id}"));
    }
}
