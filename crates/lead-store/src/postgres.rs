use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::LeadId;
use domain::Lead;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::store::LeadStore;
use crate::{Result, StoreError};

/// PostgreSQL-backed lead store.
#[derive(Clone)]
pub struct PostgresLeadStore {
    pool: PgPool,
}

impl PostgresLeadStore {
    /// Creates a new PostgreSQL lead store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_lead(row: PgRow) -> Result<Lead> {
        Ok(Lead {
            id: LeadId::new(row.try_get("id")?),
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            paid: row.try_get("paid")?,
            campaign_step: row.try_get::<i32, _>("campaign_step")? as u32,
            last_step_at: row.try_get("last_step_at")?,
        })
    }
}

#[async_trait]
impl LeadStore for PostgresLeadStore {
    async fn upsert_lead(&self, email: &str, name: &str, now: DateTime<Utc>) -> Result<Lead> {
        let row = sqlx::query(
            r#"
            INSERT INTO leads (email, name, created_at, last_step_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, email, name, created_at, paid, campaign_step, last_step_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_lead(row)
    }

    async fn mark_paid(&self, email: &str) -> Result<()> {
        let result = sqlx::query("UPDATE leads SET paid = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LeadNotFound(email.to_string()));
        }
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, created_at, paid, campaign_step, last_step_at
            FROM leads
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_lead).transpose()
    }

    async fn due_leads(
        &self,
        current_step: u32,
        min_elapsed: Duration,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Lead>> {
        let cutoff = now - min_elapsed;
        let rows = sqlx::query(
            r#"
            SELECT id, email, name, created_at, paid, campaign_step, last_step_at
            FROM leads
            WHERE paid = FALSE
              AND campaign_step = $1
              AND last_step_at <= $2
            ORDER BY last_step_at ASC
            LIMIT $3
            "#,
        )
        .bind(current_step as i32)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            current_step,
            count = rows.len(),
            "due-lead query returned"
        );
        rows.into_iter().map(Self::row_to_lead).collect()
    }

    async fn advance_step(&self, id: LeadId, new_step: u32, now: DateTime<Utc>) -> Result<()> {
        // The step guard lives in the WHERE clause so that the check and
        // the write are one atomic statement.
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET campaign_step = $1, last_step_at = $2
            WHERE id = $3 AND campaign_step = $1 - 1
            "#,
        )
        .bind(new_step as i32)
        .bind(now)
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i32> =
                sqlx::query_scalar("SELECT campaign_step FROM leads WHERE id = $1")
                    .bind(id.as_i64())
                    .fetch_optional(&self.pool)
                    .await?;

            return match current {
                Some(step) => {
                    tracing::debug!(
                        lead_id = %id,
                        current_step = step,
                        new_step,
                        "step advance rejected by guard"
                    );
                    Err(StoreError::StepConflict {
                        id,
                        current_step: step as u32,
                        new_step,
                    })
                }
                None => Err(StoreError::LeadNotFound(id.to_string())),
            };
        }
        Ok(())
    }
}
