//! Domain error types.

use thiserror::Error;

use crate::transaction::TransactionState;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A transaction state transition that the state machine forbids.
    #[error("invalid transaction transition: {from} -> {to}")]
    InvalidTransition {
        from: TransactionState,
        to: TransactionState,
    },
}
