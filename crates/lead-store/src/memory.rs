use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::LeadId;
use domain::Lead;
use tokio::sync::RwLock;

use crate::store::LeadStore;
use crate::{Result, StoreError};

#[derive(Default)]
struct Inner {
    // keyed by email, the unique key of the table
    leads: HashMap<String, Lead>,
    next_id: i64,
}

/// In-memory lead store for testing.
///
/// Provides the same interface and invariants as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryLeadStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryLeadStore {
    /// Creates a new empty in-memory lead store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of lead rows.
    pub async fn lead_count(&self) -> usize {
        self.inner.read().await.leads.len()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn upsert_lead(&self, email: &str, name: &str, now: DateTime<Utc>) -> Result<Lead> {
        let mut inner = self.inner.write().await;
        if let Some(lead) = inner.leads.get_mut(email) {
            lead.name = name.to_string();
            return Ok(lead.clone());
        }

        inner.next_id += 1;
        let lead = Lead {
            id: LeadId::new(inner.next_id),
            email: email.to_string(),
            name: name.to_string(),
            created_at: now,
            paid: false,
            campaign_step: 0,
            last_step_at: now,
        };
        inner.leads.insert(email.to_string(), lead.clone());
        Ok(lead)
    }

    async fn mark_paid(&self, email: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let lead = inner
            .leads
            .get_mut(email)
            .ok_or_else(|| StoreError::LeadNotFound(email.to_string()))?;
        lead.paid = true;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>> {
        Ok(self.inner.read().await.leads.get(email).cloned())
    }

    async fn due_leads(
        &self,
        current_step: u32,
        min_elapsed: Duration,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Lead>> {
        let inner = self.inner.read().await;
        let mut due: Vec<Lead> = inner
            .leads
            .values()
            .filter(|l| {
                !l.paid && l.campaign_step == current_step && now - l.last_step_at >= min_elapsed
            })
            .cloned()
            .collect();
        // Oldest first, same as the SQL ORDER BY last_step_at
        due.sort_by_key(|l| l.last_step_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn advance_step(&self, id: LeadId, new_step: u32, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let lead = inner
            .leads
            .values_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::LeadNotFound(id.to_string()))?;

        if lead.campaign_step + 1 != new_step {
            return Err(StoreError::StepConflict {
                id,
                current_step: lead.campaign_step,
                new_step,
            });
        }
        lead.campaign_step = new_step;
        lead.last_step_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_idempotent_and_keeps_latest_name() {
        let store = InMemoryLeadStore::new();
        let now = Utc::now();

        let first = store.upsert_lead("a@b.test", "Al", now).await.unwrap();
        let second = store.upsert_lead("a@b.test", "Albert", now).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Albert");
        assert_eq!(store.lead_count().await, 1);
    }

    #[tokio::test]
    async fn upsert_preserves_campaign_progress() {
        let store = InMemoryLeadStore::new();
        let now = Utc::now();

        let lead = store.upsert_lead("a@b.test", "Al", now).await.unwrap();
        store.advance_step(lead.id, 1, now).await.unwrap();

        let again = store.upsert_lead("a@b.test", "Al", now).await.unwrap();
        assert_eq!(again.campaign_step, 1);
    }

    #[tokio::test]
    async fn paid_leads_are_never_due() {
        let store = InMemoryLeadStore::new();
        let now = Utc::now();
        store.upsert_lead("a@b.test", "Al", now).await.unwrap();
        store.mark_paid("a@b.test").await.unwrap();

        for step in 0..3 {
            let due = store
                .due_leads(step, Duration::zero(), 50, now + Duration::days(30))
                .await
                .unwrap();
            assert!(due.is_empty());
        }
    }

    #[tokio::test]
    async fn due_respects_elapsed_window() {
        let store = InMemoryLeadStore::new();
        let t0 = Utc::now();
        store.upsert_lead("a@b.test", "Al", t0).await.unwrap();

        let before = store
            .due_leads(0, Duration::hours(1), 50, t0 + Duration::minutes(30))
            .await
            .unwrap();
        assert!(before.is_empty());

        let after = store
            .due_leads(0, Duration::hours(1), 50, t0 + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn due_is_bounded_and_oldest_first() {
        let store = InMemoryLeadStore::new();
        let t0 = Utc::now();
        for i in 0..5 {
            store
                .upsert_lead(&format!("lead{i}@b.test"), "L", t0 + Duration::minutes(i))
                .await
                .unwrap();
        }

        let due = store
            .due_leads(0, Duration::zero(), 3, t0 + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(due.len(), 3);
        assert_eq!(due[0].email, "lead0@b.test");
        assert_eq!(due[2].email, "lead2@b.test");
    }

    #[tokio::test]
    async fn advance_step_moves_by_exactly_one() {
        let store = InMemoryLeadStore::new();
        let now = Utc::now();
        let lead = store.upsert_lead("a@b.test", "Al", now).await.unwrap();

        // Skipping a step is rejected
        let err = store.advance_step(lead.id, 2, now).await.unwrap_err();
        assert!(matches!(err, StoreError::StepConflict { .. }));

        store.advance_step(lead.id, 1, now).await.unwrap();
        // Repeating a step is rejected
        let err = store.advance_step(lead.id, 1, now).await.unwrap_err();
        assert!(matches!(err, StoreError::StepConflict { .. }));

        store.advance_step(lead.id, 2, now).await.unwrap();
        let lead = store.find_by_email("a@b.test").await.unwrap().unwrap();
        assert_eq!(lead.campaign_step, 2);
    }

    #[tokio::test]
    async fn mark_paid_unknown_email_errors() {
        let store = InMemoryLeadStore::new();
        let err = store.mark_paid("ghost@b.test").await.unwrap_err();
        assert!(matches!(err, StoreError::LeadNotFound(_)));
    }

    #[tokio::test]
    async fn advance_step_updates_last_step_at() {
        let store = InMemoryLeadStore::new();
        let t0 = Utc::now();
        let lead = store.upsert_lead("a@b.test", "Al", t0).await.unwrap();

        let t1 = t0 + Duration::hours(1);
        store.advance_step(lead.id, 1, t1).await.unwrap();

        let lead = store.find_by_email("a@b.test").await.unwrap().unwrap();
        assert_eq!(lead.last_step_at, t1);
    }
}
