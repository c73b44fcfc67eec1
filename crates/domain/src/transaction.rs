//! The saga-scoped payment transaction state machine.

use common::{Money, PaymentRef};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// The state of a payment transaction within one saga execution.
///
/// State transitions:
/// ```text
/// Charged ──┬──► Delivered
///           └──► RefundPending ──┬──► Refunded
///                                └──► RefundFailed
/// ```
///
/// A transaction exists only after a successful charge. `Delivered`,
/// `Refunded`, and `RefundFailed` are terminal; `Delivered` and `Refunded`
/// are mutually exclusive for a single payment reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// The customer's card has been charged.
    Charged,

    /// The document was dispatched; the charge is earned (terminal).
    Delivered,

    /// Render or dispatch failed after the charge; a refund is owed.
    RefundPending,

    /// The charge was reversed (terminal).
    Refunded,

    /// The refund attempt itself failed; manual reconciliation is
    /// required (terminal).
    RefundFailed,
}

impl TransactionState {
    /// Returns true if the document may still be marked delivered.
    pub fn can_deliver(&self) -> bool {
        matches!(self, TransactionState::Charged)
    }

    /// Returns true if a refund may be initiated.
    pub fn can_request_refund(&self) -> bool {
        matches!(self, TransactionState::Charged)
    }

    /// Returns true if a refund outcome may be recorded.
    pub fn can_resolve_refund(&self) -> bool {
        matches!(self, TransactionState::RefundPending)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Delivered
                | TransactionState::Refunded
                | TransactionState::RefundFailed
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Charged => "Charged",
            TransactionState::Delivered => "Delivered",
            TransactionState::RefundPending => "RefundPending",
            TransactionState::Refunded => "Refunded",
            TransactionState::RefundFailed => "RefundFailed",
        }
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One charge and its fate, tracked for the duration of a single saga
/// execution. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    payment_ref: PaymentRef,
    amount: Money,
    customer_email: String,
    state: TransactionState,
}

impl Transaction {
    /// Creates a transaction for a charge that has already succeeded.
    pub fn charged(payment_ref: PaymentRef, amount: Money, customer_email: impl Into<String>) -> Self {
        Self {
            payment_ref,
            amount,
            customer_email: customer_email.into(),
            state: TransactionState::Charged,
        }
    }

    /// Records successful dispatch of the document.
    pub fn mark_delivered(&mut self) -> Result<(), DomainError> {
        self.transition_to(TransactionState::Delivered, |s| s.can_deliver())
    }

    /// Records that a refund is owed because render or dispatch failed.
    pub fn mark_refund_pending(&mut self) -> Result<(), DomainError> {
        self.transition_to(TransactionState::RefundPending, |s| s.can_request_refund())
    }

    /// Records a successful refund.
    pub fn mark_refunded(&mut self) -> Result<(), DomainError> {
        self.transition_to(TransactionState::Refunded, |s| s.can_resolve_refund())
    }

    /// Records a failed refund attempt.
    pub fn mark_refund_failed(&mut self) -> Result<(), DomainError> {
        self.transition_to(TransactionState::RefundFailed, |s| s.can_resolve_refund())
    }

    fn transition_to(
        &mut self,
        to: TransactionState,
        allowed: impl Fn(&TransactionState) -> bool,
    ) -> Result<(), DomainError> {
        if !allowed(&self.state) {
            return Err(DomainError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Returns the gateway's payment reference.
    pub fn payment_ref(&self) -> &PaymentRef {
        &self.payment_ref
    }

    /// Returns the charged amount.
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the customer email used for receipt and audit.
    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    /// Returns the current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }
}
