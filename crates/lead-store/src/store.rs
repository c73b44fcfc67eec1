use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::LeadId;
use domain::Lead;

use crate::Result;

/// Core trait for lead store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Mutations are
/// last-writer-consistent per row; no cross-row transaction is required.
///
/// Every operation takes `now` explicitly so that eligibility windows are
/// computed against the caller's clock and tests can drive time.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Creates or updates the lead for `email`.
    ///
    /// Idempotent: calling twice with the same email leaves exactly one
    /// row, with the latest name. Campaign progress and payment status of
    /// an existing row are untouched.
    async fn upsert_lead(&self, email: &str, name: &str, now: DateTime<Utc>) -> Result<Lead>;

    /// Marks the lead for `email` as paid. A paid lead is permanently
    /// invisible to the campaign scheduler.
    async fn mark_paid(&self, email: &str) -> Result<()>;

    /// Returns the lead for `email`, if one exists.
    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>>;

    /// Returns unpaid leads sitting at `current_step` whose last send (or
    /// creation) is at least `min_elapsed` before `now`, bounded to `limit`
    /// rows so one tick never does unbounded work.
    async fn due_leads(
        &self,
        current_step: u32,
        min_elapsed: Duration,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Lead>>;

    /// Records a confirmed send: sets `campaign_step = new_step` and
    /// `last_step_at = now`.
    ///
    /// Fails with [`StoreError::StepConflict`] unless the lead currently
    /// sits at `new_step - 1`, which keeps `campaign_step` monotonic and
    /// moving by exactly one.
    ///
    /// [`StoreError::StepConflict`]: crate::StoreError::StepConflict
    async fn advance_step(&self, id: LeadId, new_step: u32, now: DateTime<Utc>) -> Result<()>;
}
