//! Shared types used across the noticeflow crates.

pub mod types;

pub use types::{IdempotencyKey, LeadId, Money, PaymentRef, TrackingRef};
