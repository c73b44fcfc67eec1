//! Domain model for the noticeflow system.
//!
//! Holds the three data contracts shared by both engines:
//! - [`Lead`] and [`CampaignStep`] — drip-campaign progress and the
//!   eligibility rule that gates each step.
//! - [`Transaction`] — the saga-scoped payment state machine.
//! - [`NoticeFields`] and friends — the structured content of a notice.

pub mod error;
pub mod lead;
pub mod notice;
pub mod transaction;

pub use error::DomainError;
pub use lead::{CampaignStep, Lead};
pub use notice::{Document, NoticeFields, PostalAddress, ServiceLevel};
pub use transaction::{Transaction, TransactionState};
