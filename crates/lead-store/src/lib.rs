//! Lead persistence for noticeflow.
//!
//! The lead store is the only durable state either engine touches: one row
//! per unique email carrying payment status and campaign progress. The saga
//! coordinator flips `paid`; the campaign scheduler advances `campaign_step`
//! and `last_step_at`. Rows are never deleted by either engine.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::StoreError;
pub use memory::InMemoryLeadStore;
pub use postgres::PostgresLeadStore;
pub use store::LeadStore;

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
