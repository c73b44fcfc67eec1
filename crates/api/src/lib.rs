//! HTTP surface for noticeflow.
//!
//! Two business endpoints — `POST /notices` (the pay-and-send saga) and
//! `POST /leads` (drip-campaign capture) — plus health and Prometheus
//! metrics, with structured logging on every request.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use channels::{EmailChannel, InMemoryEmailChannel, InMemoryOperatorAlert, OperatorAlert};
use lead_store::{InMemoryLeadStore, LeadStore};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    CarrierDispatcher, DocumentRenderer, HtmlNoticeRenderer, InMemoryCarrierDispatcher,
    InMemoryPaymentGateway, PaymentGateway, SagaCoordinator,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::notices::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<P, C, R, L, E, A>(
    state: Arc<AppState<P, C, R, L, E, A>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    P: PaymentGateway + 'static,
    C: CarrierDispatcher + 'static,
    R: DocumentRenderer + 'static,
    L: LeadStore + 'static,
    E: EmailChannel + Clone + 'static,
    A: OperatorAlert + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/notices", post(routes::notices::create::<P, C, R, L, E, A>))
        .route("/leads", post(routes::leads::capture::<P, C, R, L, E, A>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// State over in-memory services, as used by the API tests.
pub type InMemoryAppState = AppState<
    InMemoryPaymentGateway,
    InMemoryCarrierDispatcher,
    HtmlNoticeRenderer,
    InMemoryLeadStore,
    InMemoryEmailChannel,
    InMemoryOperatorAlert,
>;

/// The in-memory service doubles backing [`InMemoryAppState`], kept
/// cloneable so tests can inject failures and inspect calls.
#[derive(Clone)]
pub struct InMemoryServices {
    pub payment: InMemoryPaymentGateway,
    pub carrier: InMemoryCarrierDispatcher,
    pub leads: InMemoryLeadStore,
    pub email: InMemoryEmailChannel,
    pub alerts: InMemoryOperatorAlert,
}

/// Creates application state wired entirely to in-memory services.
pub fn create_default_state() -> (Arc<InMemoryAppState>, InMemoryServices) {
    let services = InMemoryServices {
        payment: InMemoryPaymentGateway::new(),
        carrier: InMemoryCarrierDispatcher::new(),
        leads: InMemoryLeadStore::new(),
        email: InMemoryEmailChannel::new(),
        alerts: InMemoryOperatorAlert::new(),
    };

    let saga = SagaCoordinator::new(
        services.payment.clone(),
        services.carrier.clone(),
        HtmlNoticeRenderer::new(),
        services.leads.clone(),
        services.email.clone(),
        services.alerts.clone(),
    );

    let state = Arc::new(AppState {
        saga,
        leads: services.leads.clone(),
        alerts: services.alerts.clone(),
    });

    (state, services)
}
