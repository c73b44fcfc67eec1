//! Saga error types.
//!
//! Business failures (declines, refunds, refund failures) are outcomes,
//! not errors; see [`SagaOutcome`]. `SagaError` covers only requests the
//! coordinator refuses to run and internal invariant violations.
//!
//! [`SagaOutcome`]: crate::SagaOutcome

use domain::DomainError;
use thiserror::Error;

/// Errors that prevent a saga from executing at all.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request is not runnable (e.g. missing payment token).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A transaction transition the linear saga flow should never produce.
    #[error("transaction state error: {0}")]
    Transaction(#[from] DomainError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
