use thiserror::Error;

/// Errors from campaign configuration and per-lead delivery.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// The step table is malformed (empty, or numbers not 1..=N in order).
    #[error("invalid campaign steps: {0}")]
    InvalidSteps(String),

    /// The email provider did not confirm the send.
    #[error("send failed: {0}")]
    Send(#[from] channels::ChannelError),

    /// The lead store failed while querying or advancing leads.
    #[error("lead store error: {0}")]
    Store(#[from] lead_store::StoreError),
}

/// Convenience type alias for campaign results.
pub type Result<T> = std::result::Result<T, CampaignError>;
