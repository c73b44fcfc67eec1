//! Channel error types.

use thiserror::Error;

/// Errors that can occur when sending through an outbound channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Network-level failure reaching the provider.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider rejected send: status {status}")]
    Rejected { status: u16 },

    /// Failure injected by an in-memory test double.
    #[error("send failed: {0}")]
    SendFailed(String),
}
