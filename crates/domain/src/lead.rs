//! Leads and the campaign-step eligibility rule.

use chrono::{DateTime, Duration, Utc};
use common::LeadId;
use serde::{Deserialize, Serialize};

/// A prospective customer tracked through the drip campaign until they pay.
///
/// One row per unique email. `campaign_step` only ever increases, by exactly
/// one, and only after a confirmed successful send for that step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub paid: bool,
    /// Highest campaign step that has been confirmed sent (0 = none yet).
    pub campaign_step: u32,
    /// Timestamp of the most recent successful send, or of creation.
    pub last_step_at: DateTime<Utc>,
}

impl Lead {
    /// Returns true if this lead is due for the given campaign step.
    ///
    /// Delays are cumulative gates, not absolute deadlines: a lead is due
    /// for step N once it sits at step N-1 and the step's delay has elapsed
    /// since the previous send (or since creation for step 1). Paid leads
    /// are never due for anything.
    pub fn is_due_for(&self, step: &CampaignStep, now: DateTime<Utc>) -> bool {
        !self.paid && self.campaign_step + 1 == step.number && now - self.last_step_at >= step.delay
    }
}

/// One email in the drip sequence.
///
/// Steps are an immutable, build-time ordered table, 1-indexed. The scheduler
/// never creates, reorders, or skips steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignStep {
    /// 1-indexed position in the sequence.
    pub number: u32,
    /// How long to wait after the previous step (or after lead creation
    /// for step 1) before this step becomes due.
    pub delay: Duration,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

impl CampaignStep {
    /// Creates a step of the campaign table.
    pub fn new(
        number: u32,
        delay: Duration,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            number,
            delay,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// The `campaign_step` value a lead must currently hold to receive
    /// this step.
    pub fn target_current_step(&self) -> u32 {
        self.number - 1
    }
}
