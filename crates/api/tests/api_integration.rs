//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use lead_store::LeadStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, api::InMemoryServices) {
    let (state, services) = api::create_default_state();
    let app = api::create_app(state, get_metrics_handle());
    (app, services)
}

fn notice_body() -> serde_json::Value {
    serde_json::json!({
        "fields": {
            "date": "January 2, 2026",
            "sender_name": "Bob Builder",
            "sender_address": "2 Side St, Fresno, CA 93650",
            "sender_role": "Subcontractor",
            "owner_name": "Jane Owner",
            "owner_address": "1 Main St, Fresno, CA 93650",
            "job_description": "Framing and drywall",
            "job_site_address": "1 Main St, Fresno, CA 93650",
            "estimated_price": "$12,000"
        },
        "to": {
            "name": "Jane Owner",
            "line1": "1 Main St",
            "city": "Fresno",
            "state": "CA",
            "zip": "93650"
        },
        "from": {
            "name": "Bob Builder",
            "line1": "2 Side St",
            "city": "Fresno",
            "state": "CA",
            "zip": "93650"
        },
        "payment_token": "tok_abc",
        "customer_email": "bob@builders.test"
    })
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "api");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn send_notice_delivered() {
    let (app, services) = setup();

    let response = app
        .oneshot(post_json("/notices", &notice_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "delivered");
    assert!(json["tracking_ref"].as_str().is_some());
    assert!(json["proof_url"].as_str().is_some());
    assert_eq!(services.payment.charge_count(), 1);
    assert_eq!(services.carrier.dispatch_count(), 1);
}

#[tokio::test]
async fn send_notice_declined_is_402() {
    let (app, services) = setup();
    services.payment.set_fail_on_charge(true);

    let response = app
        .oneshot(post_json("/notices", &notice_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let json = response_json(response).await;
    assert_eq!(json["status"], "payment_declined");
    assert!(json.get("tracking_ref").is_none());
}

#[tokio::test]
async fn send_notice_bad_address_is_422_refunded() {
    let (app, services) = setup();
    services
        .carrier
        .set_fail_with_address("failed_deliverability_strictness");

    let response = app
        .oneshot(post_json("/notices", &notice_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = response_json(response).await;
    assert_eq!(json["status"], "refunded");
    assert!(json["payment_ref"].as_str().is_some());
    assert_eq!(services.payment.refunds().len(), 1);
}

#[tokio::test]
async fn send_notice_carrier_outage_is_502_refunded() {
    let (app, services) = setup();
    services.carrier.set_fail_with_system();

    let response = app
        .oneshot(post_json("/notices", &notice_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = response_json(response).await;
    assert_eq!(json["status"], "refunded");
}

#[tokio::test]
async fn send_notice_refund_failure_is_500_with_support_message() {
    let (app, services) = setup();
    services.carrier.set_fail_with_system();
    services.payment.set_fail_on_refund(true);

    let response = app
        .oneshot(post_json("/notices", &notice_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert_eq!(json["status"], "refund_failed");
    let message = json["message"].as_str().unwrap();
    assert!(message.contains("contact support"));
    assert_eq!(services.alerts.alert_count(), 1);
}

#[tokio::test]
async fn send_notice_missing_token_is_400() {
    let (app, services) = setup();

    let mut body = notice_body();
    body["payment_token"] = serde_json::Value::String(String::new());

    let response = app.oneshot(post_json("/notices", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(services.payment.charge_count(), 0);
}

#[tokio::test]
async fn capture_lead_creates_and_is_idempotent() {
    let (app, services) = setup();

    let body = serde_json::json!({ "email": "Bob@Builders.test", "name": "Bob" });
    let response = app
        .clone()
        .oneshot(post_json("/leads", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = response_json(response).await;
    // Emails are normalized to lowercase on the way in.
    assert_eq!(json["email"], "bob@builders.test");
    assert_eq!(json["campaign_step"], 0);
    let first_id = json["id"].as_i64().unwrap();

    let body = serde_json::json!({ "email": "bob@builders.test", "name": "Robert" });
    let response = app.oneshot(post_json("/leads", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = response_json(response).await;
    assert_eq!(json["id"].as_i64().unwrap(), first_id);

    let lead = services
        .leads
        .find_by_email("bob@builders.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.name, "Robert");
}

#[tokio::test]
async fn capture_lead_rejects_bad_email() {
    let (app, services) = setup();

    let body = serde_json::json!({ "email": "not-an-email", "name": "Bob" });
    let response = app.oneshot(post_json("/leads", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(services.leads.lead_count().await, 0);
}

#[tokio::test]
async fn capture_lead_pings_the_operator_channel() {
    let (app, services) = setup();

    let body = serde_json::json!({ "email": "bob@builders.test", "name": "Bob" });
    let response = app.oneshot(post_json("/leads", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // The ping is fire-and-forget; give the spawned task a chance to run.
    for _ in 0..50 {
        if services.alerts.alert_count() > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(services.alerts.alert_count(), 1);
    assert!(services.alerts.alerts()[0].body.contains("bob@builders.test"));
}
