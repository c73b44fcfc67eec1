//! The drip campaign scheduler.
//!
//! Leads captured by the API sit in the lead store until they pay. This
//! crate walks them through a fixed, ordered email sequence: each tick
//! queries for leads whose previous step is old enough, sends the next
//! email, and advances their step only after the provider confirms the
//! send.

mod error;
mod scheduler;
mod steps;

pub use error::{CampaignError, Result};
pub use scheduler::{CampaignScheduler, TickReport};
pub use steps::default_campaign;
