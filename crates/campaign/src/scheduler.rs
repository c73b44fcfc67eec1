//! The tick-driven campaign scheduler.

use chrono::{DateTime, Utc};
use domain::{CampaignStep, Lead};
use futures_util::StreamExt;
use lead_store::LeadStore;
use tokio::time::MissedTickBehavior;

use channels::EmailChannel;

use crate::{CampaignError, Result};

const DEFAULT_BATCH_SIZE: i64 = 50;
const DEFAULT_CONCURRENCY: usize = 8;

/// What one tick accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Leads whose step email was confirmed sent and whose step advanced.
    pub sent: usize,
    /// Leads that failed at send or advance; they stay at their current
    /// step and are picked up again on a later tick.
    pub failed: usize,
}

/// Walks unpaid leads through the campaign step table.
///
/// Ticks are the unit of work: each tick scans every step in ascending
/// order, sends the step email to the leads that are due for it, and
/// advances each lead only after the provider confirms the send. A send
/// that fails leaves the lead untouched, so the next tick retries it:
/// delivery is at-least-once, never skipped.
pub struct CampaignScheduler<L, E> {
    leads: L,
    email: E,
    steps: Vec<CampaignStep>,
    batch_size: i64,
    concurrency: usize,
}

impl<L, E> CampaignScheduler<L, E>
where
    L: LeadStore,
    E: EmailChannel,
{
    /// Creates a scheduler over the given step table.
    ///
    /// The table must be non-empty with step numbers exactly 1..=N in
    /// order; the eligibility rule depends on that numbering.
    pub fn new(leads: L, email: E, steps: Vec<CampaignStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(CampaignError::InvalidSteps("step table is empty".to_string()));
        }
        for (i, step) in steps.iter().enumerate() {
            if step.number != i as u32 + 1 {
                return Err(CampaignError::InvalidSteps(format!(
                    "step at position {i} has number {}, expected {}",
                    step.number,
                    i + 1
                )));
            }
        }
        Ok(Self {
            leads,
            email,
            steps,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    /// Overrides the per-step batch size.
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Overrides how many leads are processed concurrently within a step.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs one full pass over the step table at the given instant.
    ///
    /// Steps run in ascending order. A lead advanced within this tick is
    /// not picked up again by a later step: its `last_step_at` was just
    /// reset, so the next step's delay gate cannot have elapsed.
    #[tracing::instrument(skip(self), fields(steps = self.steps.len()))]
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for step in &self.steps {
            let due = match self
                .leads
                .due_leads(step.target_current_step(), step.delay, self.batch_size, now)
                .await
            {
                Ok(due) => due,
                Err(error) => {
                    tracing::error!(step = step.number, %error, "due-lead query failed");
                    continue;
                }
            };

            if due.is_empty() {
                continue;
            }
            tracing::info!(step = step.number, count = due.len(), "leads due for step");

            let results: Vec<Result<()>> = futures_util::stream::iter(due)
                .map(|lead| self.deliver(lead, step, now))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for result in results {
                match result {
                    Ok(()) => report.sent += 1,
                    Err(_) => report.failed += 1,
                }
            }
        }

        metrics::counter!("campaign_emails_sent_total").increment(report.sent as u64);
        metrics::counter!("campaign_send_failures_total").increment(report.failed as u64);
        report
    }

    /// Sends one step email and records the advance.
    ///
    /// The advance happens only after a confirmed send. If persisting the
    /// advance fails the lead will receive this step again on a later
    /// tick; that duplicate is the accepted cost of never skipping a step.
    async fn deliver(&self, lead: Lead, step: &CampaignStep, now: DateTime<Utc>) -> Result<()> {
        if let Err(error) = self.email.send(&lead.email, &step.subject, &step.body).await {
            tracing::warn!(
                step = step.number,
                email = %lead.email,
                %error,
                "step email send failed; lead left for retry"
            );
            return Err(error.into());
        }

        if let Err(error) = self.leads.advance_step(lead.id, step.number, now).await {
            tracing::error!(
                step = step.number,
                email = %lead.email,
                %error,
                "step advance failed after a confirmed send; step will repeat"
            );
            return Err(error.into());
        }

        tracing::info!(step = step.number, email = %lead.email, "step email sent");
        Ok(())
    }

    /// Ticks forever at the given period.
    ///
    /// Each tick is awaited to completion before the next one is
    /// scheduled, so a slow pass delays the next pass instead of
    /// overlapping with it.
    pub async fn run(self, period: std::time::Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = period.as_secs(), "campaign scheduler started");

        loop {
            interval.tick().await;
            let report = self.tick(Utc::now()).await;
            if report.sent > 0 || report.failed > 0 {
                tracing::info!(sent = report.sent, failed = report.failed, "tick complete");
            }
        }
    }
}
