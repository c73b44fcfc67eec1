//! Lead store error types.

use common::LeadId;
use thiserror::Error;

/// Errors that can occur during lead store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No lead exists for the given email.
    #[error("lead not found: {0}")]
    LeadNotFound(String),

    /// A step advance that would skip or repeat a step. `campaign_step`
    /// moves forward by exactly one, from `new_step - 1`.
    #[error("lead {id}: cannot advance to step {new_step} from step {current_step}")]
    StepConflict {
        id: LeadId,
        current_step: u32,
        new_step: u32,
    },
}
