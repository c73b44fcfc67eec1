//! The authoritative result of one saga execution.

use common::{PaymentRef, TrackingRef};
use domain::TransactionState;

/// Why render or dispatch failed, shaping the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The carrier rejected the destination address. The user can fix
    /// their input and retry (a retry is a brand-new saga execution).
    InvalidAddress { message: String },

    /// System-side render or dispatch failure; nothing the user did wrong.
    System { message: String },
}

impl FailureCause {
    /// Returns the explanation of the failure.
    pub fn message(&self) -> &str {
        match self {
            FailureCause::InvalidAddress { message } | FailureCause::System { message } => message,
        }
    }

    /// Returns true if the end user can fix this by correcting their input.
    pub fn is_user_fixable(&self) -> bool {
        matches!(self, FailureCause::InvalidAddress { .. })
    }
}

/// Outcome of one saga execution.
///
/// Every variant is a legitimate business result reported synchronously to
/// the caller; none of them is a Rust-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    /// Charge, render, and dispatch all succeeded. The saga is
    /// irreversibly committed.
    Delivered {
        payment_ref: PaymentRef,
        tracking_ref: TrackingRef,
        proof_url: String,
    },

    /// The gateway declined the card. No money moved; no transaction
    /// exists. The user can re-enter their card and try again.
    PaymentDeclined { message: String },

    /// Render or dispatch failed after the charge, and the compensating
    /// refund succeeded.
    Refunded {
        payment_ref: PaymentRef,
        cause: FailureCause,
    },

    /// Render or dispatch failed after the charge, and the refund attempt
    /// failed too. Money taken, no service rendered; an operator has been
    /// alerted and the user is told to contact support.
    RefundFailed {
        payment_ref: PaymentRef,
        cause: FailureCause,
    },
}

impl SagaOutcome {
    /// Returns true if the document was dispatched.
    pub fn is_delivered(&self) -> bool {
        matches!(self, SagaOutcome::Delivered { .. })
    }

    /// The terminal transaction state this outcome corresponds to, or
    /// `None` when no charge ever succeeded.
    pub fn transaction_state(&self) -> Option<TransactionState> {
        match self {
            SagaOutcome::Delivered { .. } => Some(TransactionState::Delivered),
            SagaOutcome::PaymentDeclined { .. } => None,
            SagaOutcome::Refunded { .. } => Some(TransactionState::Refunded),
            SagaOutcome::RefundFailed { .. } => Some(TransactionState::RefundFailed),
        }
    }

    /// The payment reference, when a charge succeeded.
    pub fn payment_ref(&self) -> Option<&PaymentRef> {
        match self {
            SagaOutcome::Delivered { payment_ref, .. }
            | SagaOutcome::Refunded { payment_ref, .. }
            | SagaOutcome::RefundFailed { payment_ref, .. } => Some(payment_ref),
            SagaOutcome::PaymentDeclined { .. } => None,
        }
    }

    /// The message shown to the end user.
    ///
    /// Only user-fixable causes and the compensation-failure case surface
    /// detail; refund outcomes always carry the payment reference so the
    /// user can quote it to support.
    pub fn user_message(&self) -> String {
        match self {
            SagaOutcome::Delivered { tracking_ref, .. } => format!(
                "Notice sent successfully. Certified-mail tracking number: {tracking_ref}."
            ),
            SagaOutcome::PaymentDeclined { message } => {
                format!("Payment declined: {message}")
            }
            SagaOutcome::Refunded { payment_ref, cause } => format!(
                "{} Your card was refunded automatically (Ref: {payment_ref}).",
                cause.message()
            ),
            SagaOutcome::RefundFailed { payment_ref, cause } => format!(
                "{} Refund failed. Please contact support with Ref: {payment_ref}.",
                cause.message()
            ),
        }
    }
}
