//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p lead-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use lead_store::{LeadStore, PostgresLeadStore, StoreError};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_leads_table.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresLeadStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE leads")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLeadStore::new(pool)
}

#[tokio::test]
async fn upsert_twice_leaves_one_row_with_latest_name() {
    let store = get_test_store().await;
    let now = Utc::now();

    let first = store.upsert_lead("a@b.test", "Al", now).await.unwrap();
    let second = store.upsert_lead("a@b.test", "Albert", now).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "Albert");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn upsert_does_not_reset_progress() {
    let store = get_test_store().await;
    let now = Utc::now();

    let lead = store.upsert_lead("a@b.test", "Al", now).await.unwrap();
    store.advance_step(lead.id, 1, now).await.unwrap();

    let again = store.upsert_lead("a@b.test", "Al", now).await.unwrap();
    assert_eq!(again.campaign_step, 1);
}

#[tokio::test]
async fn due_leads_filters_paid_step_and_window() {
    let store = get_test_store().await;
    let t0 = Utc::now() - Duration::hours(2);

    store.upsert_lead("due@b.test", "Due", t0).await.unwrap();
    store.upsert_lead("paid@b.test", "Paid", t0).await.unwrap();
    store.mark_paid("paid@b.test").await.unwrap();
    store
        .upsert_lead("fresh@b.test", "Fresh", Utc::now())
        .await
        .unwrap();

    let due = store
        .due_leads(0, Duration::hours(1), 50, Utc::now())
        .await
        .unwrap();

    assert_eq!(due.len(), 1);
    assert_eq!(due[0].email, "due@b.test");
}

#[tokio::test]
async fn due_leads_is_bounded() {
    let store = get_test_store().await;
    let t0 = Utc::now() - Duration::hours(2);

    for i in 0..10 {
        store
            .upsert_lead(&format!("lead{i}@b.test"), "L", t0 + Duration::seconds(i))
            .await
            .unwrap();
    }

    let due = store
        .due_leads(0, Duration::hours(1), 4, Utc::now())
        .await
        .unwrap();
    assert_eq!(due.len(), 4);
    assert_eq!(due[0].email, "lead0@b.test");
}

#[tokio::test]
async fn advance_step_guard_is_atomic() {
    let store = get_test_store().await;
    let now = Utc::now();
    let lead = store.upsert_lead("a@b.test", "Al", now).await.unwrap();

    let err = store.advance_step(lead.id, 2, now).await.unwrap_err();
    assert!(matches!(err, StoreError::StepConflict { .. }));

    store.advance_step(lead.id, 1, now).await.unwrap();
    let err = store.advance_step(lead.id, 1, now).await.unwrap_err();
    assert!(matches!(err, StoreError::StepConflict { .. }));

    let lead = store.find_by_email("a@b.test").await.unwrap().unwrap();
    assert_eq!(lead.campaign_step, 1);
}

#[tokio::test]
async fn mark_paid_hides_lead_from_every_step() {
    let store = get_test_store().await;
    let t0 = Utc::now() - Duration::days(7);

    let lead = store.upsert_lead("a@b.test", "Al", t0).await.unwrap();
    store.advance_step(lead.id, 1, t0).await.unwrap();
    store.mark_paid("a@b.test").await.unwrap();

    for step in 0..3 {
        let due = store
            .due_leads(step, Duration::zero(), 50, Utc::now())
            .await
            .unwrap();
        assert!(due.is_empty(), "paid lead surfaced at step {step}");
    }
}

#[tokio::test]
async fn mark_paid_unknown_email_errors() {
    let store = get_test_store().await;
    let err = store.mark_paid("ghost@b.test").await.unwrap_err();
    assert!(matches!(err, StoreError::LeadNotFound(_)));
}
