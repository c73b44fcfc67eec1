//! Outbound notification channels.
//!
//! Two narrow send-and-confirm contracts:
//! - [`EmailChannel`] — campaign reminders and customer receipts. The
//!   scheduler advances a lead only after this channel confirms a send.
//! - [`OperatorAlert`] — best-effort human-attention pings, used for the
//!   refund-failure escalation and new-lead notifications.

pub mod alert;
pub mod email;
pub mod error;

pub use alert::{InMemoryOperatorAlert, OperatorAlert, WebhookOperatorAlert};
pub use email::{EmailChannel, InMemoryEmailChannel, ResendEmailChannel};
pub use error::ChannelError;

/// Convenience type alias for channel results.
pub type Result<T> = std::result::Result<T, ChannelError>;
